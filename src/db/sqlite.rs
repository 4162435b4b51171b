use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::{DateRange, SleepLogRow, SleepStore};
use crate::models::sleep_log::{NewSleepLog, SleepLog};

const COLUMNS: &str =
    "household, log_date, sleep_hours, mood, tips_applied, sleep_score, created_at, updated_at";

/// Local file-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database lives and dies with its connection, so keep
        // exactly one open for the lifetime of the pool.
        let in_memory = is_memory_url(database_url);
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { max_connections })
            .acquire_timeout(Duration::from_secs(5));
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("./migrations/sqlite").run(&pool).await?;
        tracing::info!(url = %database_url, "SQLite migrations applied");

        Ok(Self { pool })
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

#[async_trait]
impl SleepStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn upsert(&self, log: &NewSleepLog) -> Result<SleepLog, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO sleep_logs ({COLUMNS})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT (household, log_date) DO UPDATE SET
                sleep_hours = excluded.sleep_hours,
                mood = excluded.mood,
                tips_applied = excluded.tips_applied,
                sleep_score = excluded.sleep_score,
                updated_at = excluded.updated_at
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, SleepLogRow>(&sql)
            .bind(&log.household)
            .bind(log.date)
            .bind(log.sleep_hours)
            .bind(log.mood)
            .bind(log.tips_applied.to_json())
            .bind(log.sleep_score)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn list_by_household(
        &self,
        household: &str,
        range: DateRange,
    ) -> Result<Vec<SleepLog>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {COLUMNS} FROM sleep_logs
            WHERE household = ?1
              AND (?2 IS NULL OR log_date >= ?2)
              AND (?3 IS NULL OR log_date <= ?3)
            ORDER BY log_date ASC
            "#
        );

        let rows = sqlx::query_as::<_, SleepLogRow>(&sql)
            .bind(household)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_recent(&self, household: &str, limit: i64) -> Result<Vec<SleepLog>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {COLUMNS} FROM sleep_logs
            WHERE household = ?1
            ORDER BY log_date DESC
            LIMIT ?2
            "#
        );

        let rows = sqlx::query_as::<_, SleepLogRow>(&sql)
            .bind(household)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self, household: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sleep_logs WHERE household = ?1")
            .bind(household)
            .fetch_one(&self.pool)
            .await
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::conformance;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        conformance::upsert_is_idempotent(&store().await).await;
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_date() {
        conformance::upsert_replaces_same_date(&store().await).await;
    }

    #[tokio::test]
    async fn test_households_are_isolated() {
        conformance::households_are_isolated(&store().await).await;
    }

    #[tokio::test]
    async fn test_list_is_ordered_and_ranged() {
        conformance::list_is_ordered_and_ranged(&store().await).await;
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        conformance::recent_is_newest_first(&store().await).await;
    }

    #[test]
    fn test_memory_urls_are_detected() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://file:shared?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite://sleep_data.db"));
    }

    #[tokio::test]
    async fn test_mode_memory_url_shares_one_database() {
        let store = SqliteStore::connect("sqlite:sleeplog_mode_memory?mode=memory", 8)
            .await
            .unwrap();
        conformance::upsert_replaces_same_date(&store).await;
    }

    #[tokio::test]
    async fn test_ping() {
        store().await.ping().await.unwrap();
    }
}
