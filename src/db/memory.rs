use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use super::{DateRange, SleepStore};
use crate::models::sleep_log::{NewSleepLog, SleepLog};

/// Process-local store for tests and throwaway demos.
#[derive(Default)]
pub struct MemoryStore {
    logs: RwLock<BTreeMap<(String, NaiveDate), SleepLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SleepStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, log: &NewSleepLog) -> Result<SleepLog, sqlx::Error> {
        let mut logs = self.logs.write().await;
        let now = Utc::now();
        let key = (log.household.clone(), log.date);
        let created_at = logs.get(&key).map_or(now, |existing| existing.created_at);

        let saved = SleepLog {
            household: log.household.clone(),
            date: log.date,
            sleep_hours: log.sleep_hours,
            mood: log.mood,
            tips_applied: log.tips_applied.clone(),
            sleep_score: log.sleep_score,
            created_at,
            updated_at: now,
        };
        logs.insert(key, saved.clone());
        Ok(saved)
    }

    async fn list_by_household(
        &self,
        household: &str,
        range: DateRange,
    ) -> Result<Vec<SleepLog>, sqlx::Error> {
        let logs = self.logs.read().await;
        Ok(logs
            .values()
            .filter(|l| l.household == household && range.contains(l.date))
            .cloned()
            .collect())
    }

    async fn list_recent(&self, household: &str, limit: i64) -> Result<Vec<SleepLog>, sqlx::Error> {
        let logs = self.logs.read().await;
        Ok(logs
            .values()
            .rev()
            .filter(|l| l.household == household)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn count(&self, household: &str) -> Result<i64, sqlx::Error> {
        let logs = self.logs.read().await;
        Ok(logs.values().filter(|l| l.household == household).count() as i64)
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}
