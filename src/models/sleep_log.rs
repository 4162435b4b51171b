use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// One logged night for a household. At most one per (household, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepLog {
    pub household: String,
    pub date: NaiveDate,
    pub sleep_hours: f64,
    pub mood: i32,
    pub tips_applied: TipSet,
    pub sleep_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Write-side shape handed to the store. The score is already computed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSleepLog {
    pub household: String,
    pub date: NaiveDate,
    pub sleep_hours: f64,
    pub mood: i32,
    pub tips_applied: TipSet,
    pub sleep_score: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertSleepLogRequest {
    /// Defaults to today (UTC)
    pub date: Option<NaiveDate>,

    #[validate(range(min = 0.0, max = 24.0, message = "Sleep hours must be between 0 and 24"))]
    pub sleep_hours: f64,

    #[validate(range(min = 1, max = 10, message = "Mood must be between 1 and 10"))]
    pub mood: i32,

    #[serde(default)]
    pub tips_applied: TipSet,
}

#[derive(Debug, Deserialize)]
pub struct SleepLogQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// Set of tip identifiers a household has already acted on.
///
/// Identifiers are normalized (trimmed, lowercased, whitespace runs turned
/// into `_`) so `"Try journaling"` and `"try_journaling"` are the same tip.
/// Membership is exact; a tip is never matched by substring.
///
/// Deserializes from either a JSON array or the older free-text form where
/// tips were joined with `,` or `;`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TipSet(BTreeSet<String>);

impl TipSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(raw: &str) -> Option<String> {
        let id = raw
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("_");
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    /// Parse the legacy joined-text field.
    pub fn parse_legacy(text: &str) -> Self {
        text.split([',', ';']).collect()
    }

    pub fn insert(&mut self, raw: &str) -> bool {
        match Self::normalize(raw) {
            Some(id) => self.0.insert(id),
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        Self::normalize(id).is_some_and(|id| self.0.contains(&id))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// `;`-joined form used by the CSV export.
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(";")
    }

    /// Storage encoding: a JSON array in a TEXT column.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".into())
    }

    /// Decode the storage column, accepting rows written by the old
    /// free-text format as well.
    pub fn from_stored(text: &str) -> Self {
        match serde_json::from_str::<Vec<String>>(text) {
            Ok(ids) => ids.iter().map(String::as_str).collect(),
            Err(_) => Self::parse_legacy(text),
        }
    }
}

impl<'a> FromIterator<&'a str> for TipSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = TipSet::new();
        for raw in iter {
            set.insert(raw);
        }
        set
    }
}

impl<'de> Deserialize<'de> for TipSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<String>),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::List(ids) => ids.iter().map(String::as_str).collect(),
            Raw::Text(text) => TipSet::parse_legacy(&text),
        })
    }
}
