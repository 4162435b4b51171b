//! # Sleep Log API: Request/Response DTOs
//!
//! Contract types for the analytics and tips endpoints. Sleep log rows
//! themselves are serialized straight from `models::sleep_log`.
//!
//! Conventions:
//! - `*Request` / `*Query` → deserialized from client JSON body or query params
//! - `*Response` → serialized to client JSON
//! - Range validation is expressed via `validator` derive macros

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::sleep_log::{SleepLog, TipSet};
use crate::services::tips::Tip;
use crate::services::trends::{SleepOutlook, WindowAverages};

// ============================================================================
// Sleep logs
// ============================================================================

/// POST /api/sleep-logs
#[derive(Debug, Serialize)]
pub struct SavedSleepLogResponse {
    #[serde(flatten)]
    pub log: SleepLog,
    /// Catalog tips for this night that have not been applied yet
    pub suggested_tips: Vec<Tip>,
}

/// GET /api/sleep-logs/count
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub household: String,
    pub total_days: i64,
}

// ============================================================================
// Analytics
// ============================================================================

/// GET /api/analytics/summary
#[derive(Debug, Serialize)]
pub struct AnalyticsSummaryResponse {
    pub household: String,
    pub total_days: usize,
    pub latest_score: Option<f64>,
    pub streak: StreakSummary,
    /// max - min sleep hours over all logs
    pub variability_hours: Option<f64>,
    pub predicted_next_sleep: Option<f64>,
    pub outlook: Option<OutlookSummary>,
    /// Averages over the tip lookback window
    pub recent: Option<WindowAverages>,
    pub tips: Vec<Tip>,
}

#[derive(Debug, Serialize)]
pub struct StreakSummary {
    pub days: usize,
    pub threshold_hours: f64,
}

#[derive(Debug, Serialize)]
pub struct OutlookSummary {
    pub kind: SleepOutlook,
    pub message: String,
}

impl From<SleepOutlook> for OutlookSummary {
    fn from(kind: SleepOutlook) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
        }
    }
}

/// GET /api/analytics/rolling
#[derive(Debug, Deserialize)]
pub struct RollingQuery {
    pub window: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RollingResponse {
    pub window: usize,
    pub dates: Vec<NaiveDate>,
    pub rolling_sleep: Vec<f64>,
    pub rolling_mood: Vec<f64>,
}

/// GET /api/analytics/compare
#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub pivot: NaiveDate,
}

// ============================================================================
// Tips
// ============================================================================

/// POST /api/tips/daily
#[derive(Debug, Deserialize, Validate)]
pub struct DailyTipsRequest {
    #[validate(range(min = 0.0, max = 24.0, message = "Sleep hours must be between 0 and 24"))]
    pub sleep_hours: f64,

    #[validate(range(min = 1, max = 10, message = "Mood must be between 1 and 10"))]
    pub mood: i32,

    /// Identifiers (or legacy joined text) of tips already applied
    #[serde(default)]
    pub previous_tips: TipSet,
}

#[derive(Debug, Serialize)]
pub struct TipsResponse {
    pub tips: Vec<Tip>,
}
