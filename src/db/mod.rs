//! Record store adapters.
//!
//! Handlers only see [`SleepStore`]. Which backend sits behind it is picked
//! from the `DATABASE_URL` scheme at startup; each backend owns its own pool
//! so connections are checked out per query and released when it finishes.

mod memory;
mod postgres;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::config::Config;
use crate::models::sleep_log::{NewSleepLog, SleepLog, TipSet};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use sqlite::SqliteStore;

/// Inclusive date bounds; `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

#[async_trait]
pub trait SleepStore: Send + Sync {
    /// Short backend name for logs and probes.
    fn backend(&self) -> &'static str;

    /// Insert or fully replace the log for `(household, date)`.
    async fn upsert(&self, log: &NewSleepLog) -> Result<SleepLog, sqlx::Error>;

    /// A household's logs, oldest first.
    async fn list_by_household(
        &self,
        household: &str,
        range: DateRange,
    ) -> Result<Vec<SleepLog>, sqlx::Error>;

    /// The newest `limit` logs, newest first.
    async fn list_recent(&self, household: &str, limit: i64) -> Result<Vec<SleepLog>, sqlx::Error>;

    async fn count(&self, household: &str) -> Result<i64, sqlx::Error>;

    async fn ping(&self) -> Result<(), sqlx::Error>;
}

pub type DynStore = Arc<dyn SleepStore>;

/// Open the store named by `config.database_url` and bring its schema up
/// to date.
pub async fn connect(config: &Config) -> anyhow::Result<DynStore> {
    let url = config.database_url.as_str();

    let store: DynStore = if url.starts_with("memory:") {
        Arc::new(MemoryStore::new())
    } else if url.starts_with("sqlite:") {
        Arc::new(SqliteStore::connect(url, config.db_max_connections).await?)
    } else if url.starts_with("postgres:") || url.starts_with("postgresql:") {
        Arc::new(PgStore::connect(url, config.db_max_connections).await?)
    } else {
        anyhow::bail!("Unsupported DATABASE_URL scheme: {url}");
    };

    tracing::info!(backend = store.backend(), "Sleep log store ready");
    Ok(store)
}

#[derive(Debug, FromRow)]
struct SleepLogRow {
    household: String,
    log_date: NaiveDate,
    sleep_hours: f64,
    mood: i32,
    tips_applied: String,
    sleep_score: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SleepLogRow> for SleepLog {
    fn from(row: SleepLogRow) -> Self {
        Self {
            household: row.household,
            date: row.log_date,
            sleep_hours: row.sleep_hours,
            mood: row.mood,
            tips_applied: TipSet::from_stored(&row.tips_applied),
            sleep_score: row.sleep_score,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_bounds_are_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        let range = DateRange {
            start: Some(d(2)),
            end: Some(d(4)),
        };
        assert!(!range.contains(d(1)));
        assert!(range.contains(d(2)));
        assert!(range.contains(d(4)));
        assert!(!range.contains(d(5)));
        assert!(DateRange::all().contains(d(1)));
    }
}
