use std::env;
use std::str::FromStr;

use crate::household::Household;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    /// Household used when a request does not name one (single-user setups).
    pub default_household: String,

    /// Optional JSON file replacing the built-in daily tip catalog.
    pub tip_catalog_path: Option<String>,

    pub analytics: AnalyticsSettings,
}

/// Thresholds and windows the analytics engine runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSettings {
    pub streak_threshold_hours: f64,
    pub tip_lookback_days: usize,
    pub rolling_window_days: usize,
    pub short_sleep_hours: f64,
    pub target_sleep_hours: f64,
    pub variability_alert_hours: f64,
    pub low_mood_average: f64,
    pub max_daily_tips: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            streak_threshold_hours: 7.0,
            tip_lookback_days: 7,
            rolling_window_days: 7,
            short_sleep_hours: 6.0,
            target_sleep_hours: 7.0,
            variability_alert_hours: 3.0,
            low_mood_average: 6.0,
            max_daily_tips: 2,
        }
    }
}

impl AnalyticsSettings {
    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            streak_threshold_hours: parse_var(&var, "STREAK_THRESHOLD_HOURS", defaults.streak_threshold_hours)?,
            tip_lookback_days: parse_var(&var, "TIP_LOOKBACK_DAYS", defaults.tip_lookback_days)?.max(1),
            rolling_window_days: parse_var(&var, "ROLLING_WINDOW_DAYS", defaults.rolling_window_days)?.max(1),
            short_sleep_hours: parse_var(&var, "SHORT_SLEEP_HOURS", defaults.short_sleep_hours)?,
            target_sleep_hours: parse_var(&var, "TARGET_SLEEP_HOURS", defaults.target_sleep_hours)?,
            variability_alert_hours: parse_var(&var, "VARIABILITY_ALERT_HOURS", defaults.variability_alert_hours)?,
            low_mood_average: parse_var(&var, "LOW_MOOD_AVERAGE", defaults.low_mood_average)?,
            max_daily_tips: parse_var(&var, "MAX_DAILY_TIPS", defaults.max_daily_tips)?,
        };

        // The duration tiers (short, slight deficit, sufficient) need a
        // non-empty band between the two cut-offs.
        if settings.short_sleep_hours >= settings.target_sleep_hours {
            anyhow::bail!(
                "SHORT_SLEEP_HOURS ({}) must be below TARGET_SLEEP_HOURS ({})",
                settings.short_sleep_hours,
                settings.target_sleep_hours
            );
        }
        Ok(settings)
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let default_household = match var("DEFAULT_HOUSEHOLD").filter(|s| !s.trim().is_empty()) {
            Some(raw) => Household::parse(&raw)
                .map_err(|e| anyhow::anyhow!("DEFAULT_HOUSEHOLD is invalid: {e}"))?
                .0,
            None => "default".into(),
        };

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| "sqlite://sleep_data.db".into()),
            db_max_connections: parse_var(&var, "DB_MAX_CONNECTIONS", 10)?,
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_var(&var, "PORT", 8080)?,
            frontend_url: var("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".into()),

            default_household,

            tip_catalog_path: var("TIP_CATALOG_PATH").filter(|s| !s.is_empty()),

            analytics: AnalyticsSettings::from_vars(&var)?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Unset means `default`; set but unparseable is a startup error.
fn parse_var<T>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be a number, got {raw:?}: {e}")),
        None => Ok(default),
    }
}
