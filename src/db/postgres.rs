use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{DateRange, SleepLogRow, SleepStore};
use crate::models::sleep_log::{NewSleepLog, SleepLog};

const COLUMNS: &str =
    "household, log_date, sleep_hours, mood, tips_applied, sleep_score, created_at, updated_at";

/// Remote store shared by several households.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations/postgres").run(&pool).await?;
        tracing::info!("Postgres migrations applied");

        Ok(Self { pool })
    }
}

#[async_trait]
impl SleepStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn upsert(&self, log: &NewSleepLog) -> Result<SleepLog, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO sleep_logs ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            ON CONFLICT (household, log_date) DO UPDATE SET
                sleep_hours = EXCLUDED.sleep_hours,
                mood = EXCLUDED.mood,
                tips_applied = EXCLUDED.tips_applied,
                sleep_score = EXCLUDED.sleep_score,
                updated_at = NOW()
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
            WHERE household = $1
              AND ($2::date IS NULL OR log_date >= $2)
              AND ($3::date IS NULL OR log_date <= $3)
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
            WHERE household = $1
            ORDER BY log_date DESC
            LIMIT $2
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
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sleep_logs WHERE household = $1")
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

    // Needs a throwaway database; skipped unless TEST_POSTGRES_URL is set.
    async fn store() -> Option<PgStore> {
        let url = std::env::var("TEST_POSTGRES_URL").ok()?;
        let store = PgStore::connect(&url, 2).await.unwrap();
        sqlx::query("TRUNCATE sleep_logs")
            .execute(&store.pool)
            .await
            .unwrap();
        Some(store)
    }

    #[tokio::test]
    async fn test_postgres_conformance() {
        let Some(store) = store().await else {
            return;
        };
        conformance::upsert_is_idempotent(&store).await;
        conformance::upsert_replaces_same_date(&store).await;
        conformance::households_are_isolated(&store).await;
        conformance::list_is_ordered_and_ranged(&store).await;
        conformance::recent_is_newest_first(&store).await;
        store.ping().await.unwrap();
    }
}
