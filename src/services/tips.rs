//! Rule-based, explainable sleep tips.
//!
//! Two generators live here. [`generate_tips`] looks at a trailing window
//! of logs and walks a fixed table of (predicate, tip) rules. [`daily_tips`]
//! looks at a single night and picks from an ordered [`TipCatalog`],
//! skipping tips the household has already applied.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::trends::{trailing, window_averages, WindowAverages};
use crate::config::AnalyticsSettings;
use crate::models::sleep_log::{SleepLog, TipSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    pub id: String,
    pub title: String,
    pub explanation: String,
}

struct WindowRule {
    id: &'static str,
    title: &'static str,
    explanation: &'static str,
    applies: fn(&WindowAverages, &AnalyticsSettings) -> bool,
}

impl WindowRule {
    fn tip(&self) -> Tip {
        Tip {
            id: self.id.into(),
            title: self.title.into(),
            explanation: self.explanation.into(),
        }
    }
}

fn no_data() -> Tip {
    Tip {
        id: "no_data".into(),
        title: "No data".into(),
        explanation: "Please log sleep for several days to receive personalized tips.".into(),
    }
}

// Duration tiers, checked in order. The first match wins and the last one
// always matches, so every window gets exactly one.
const DURATION_TIERS: &[WindowRule] = &[
    WindowRule {
        id: "short_sleep",
        title: "Short Sleep (<6h)",
        explanation: "Your recent average sleep is below 6 hours. Target 7-9 hours. Try a fixed bedtime and avoid caffeine after 2pm.",
        applies: |w, s| w.avg_sleep < s.short_sleep_hours,
    },
    WindowRule {
        id: "slight_deficit",
        title: "Suboptimal Sleep (6-7h)",
        explanation: "Slight deficit. Shift bedtime earlier by 15-30 minutes and maintain consistent wake time.",
        applies: |w, s| w.avg_sleep < s.target_sleep_hours,
    },
    WindowRule {
        id: "sufficient_sleep",
        title: "Sufficient Average Sleep",
        explanation: "Your weekly average is within recommended range. Focus on consistency.",
        applies: |_, _| true,
    },
];

// Independent alerts appended after the tier.
const ALERT_RULES: &[WindowRule] = &[
    WindowRule {
        id: "high_variability",
        title: "High Night-to-Night Variability",
        explanation: "Large variation between nights suggests an inconsistent schedule. Aim to keep bedtime/wake within 1 hour daily.",
        applies: |w, s| w.sleep_range >= s.variability_alert_hours,
    },
    WindowRule {
        id: "mood_and_sleep",
        title: "Mood & Sleep",
        explanation: "Your mood appears low when sleep is short. Improving sleep consistency may improve daytime mood.",
        applies: |w, s| w.avg_mood < s.low_mood_average && w.avg_sleep < s.target_sleep_hours,
    },
];

/// Tips for the trailing `lookback_days` records.
///
/// An empty window yields only the "No data" tip. Otherwise the first
/// matching [`DURATION_TIERS`] entry comes first, followed by every
/// matching [`ALERT_RULES`] entry in order.
pub fn generate_tips(records: &[SleepLog], lookback_days: usize, settings: &AnalyticsSettings) -> Vec<Tip> {
    let Ok(window) = window_averages(trailing(records, lookback_days)) else {
        return vec![no_data()];
    };

    DURATION_TIERS
        .iter()
        .find(|rule| (rule.applies)(&window, settings))
        .into_iter()
        .chain(
            ALERT_RULES
                .iter()
                .filter(|rule| (rule.applies)(&window, settings)),
        )
        .map(WindowRule::tip)
        .collect()
}

/// When a catalog tip is eligible for a single night.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DailyRule {
    SleepBelow { hours: f64 },
    SleepAbove { hours: f64 },
    MoodAtMost { mood: i32 },
    MoodAtLeast { mood: i32 },
    Always,
}

impl DailyRule {
    pub fn matches(&self, sleep_hours: f64, mood: i32) -> bool {
        match *self {
            DailyRule::SleepBelow { hours } => sleep_hours < hours,
            DailyRule::SleepAbove { hours } => sleep_hours > hours,
            DailyRule::MoodAtMost { mood: limit } => mood <= limit,
            DailyRule::MoodAtLeast { mood: limit } => mood >= limit,
            DailyRule::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub explanation: String,
    pub when: DailyRule,
}

/// Ordered tip catalog. Order is the tie-break when more tips qualify than
/// are returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipCatalog {
    entries: Vec<CatalogEntry>,
}

impl Default for TipCatalog {
    fn default() -> Self {
        let entry = |id: &str, title: &str, explanation: &str, when| CatalogEntry {
            id: id.into(),
            title: title.into(),
            explanation: explanation.into(),
            when,
        };

        Self {
            entries: vec![
                entry(
                    "reduce_screen_time",
                    "Reduce screen time",
                    "Put phones and laptops away an hour before bed so you can fall asleep sooner.",
                    DailyRule::SleepBelow { hours: 6.0 },
                ),
                entry(
                    "avoid_oversleeping",
                    "Avoid oversleeping",
                    "Long nights can leave you groggy. Keep a consistent wake time, even on weekends.",
                    DailyRule::SleepAbove { hours: 9.0 },
                ),
                entry(
                    "mindfulness_exercise",
                    "Try a mindfulness exercise",
                    "A few minutes of slow breathing or a short meditation can lift a low mood.",
                    DailyRule::MoodAtMost { mood: 4 },
                ),
                entry(
                    "keep_good_habits",
                    "Keep up the good habits",
                    "Whatever you did yesterday is working. Repeat it tonight.",
                    DailyRule::MoodAtLeast { mood: 8 },
                ),
                entry(
                    "try_journaling",
                    "Try journaling",
                    "Writing down a few thoughts before bed helps clear your head.",
                    DailyRule::Always,
                ),
            ],
        }
    }
}

impl TipCatalog {
    /// Load an ordered JSON array of catalog entries.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tip catalog {}", path.display()))?;
        let catalog: TipCatalog = serde_json::from_str(&text)
            .with_context(|| format!("Invalid tip catalog {}", path.display()))?;
        catalog.check()?;
        Ok(catalog)
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.entries.is_empty() {
            anyhow::bail!("Tip catalog is empty");
        }
        let mut seen = HashSet::new();
        for entry in &self.entries {
            let id = TipSet::normalize(&entry.id)
                .ok_or_else(|| anyhow::anyhow!("Tip catalog entry has a blank id"))?;
            if id != entry.id {
                anyhow::bail!("Tip id {:?} is not normalized (expected {:?})", entry.id, id);
            }
            if !seen.insert(id) {
                anyhow::bail!("Duplicate tip id {:?} in catalog", entry.id);
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Up to `limit` catalog tips for one night, in catalog order, leaving out
/// anything listed in `previous`.
pub fn daily_tips(
    sleep_hours: f64,
    mood: i32,
    previous: &TipSet,
    catalog: &TipCatalog,
    limit: usize,
) -> Vec<Tip> {
    catalog
        .entries()
        .iter()
        .filter(|entry| entry.when.matches(sleep_hours, mood))
        .filter(|entry| !previous.contains(&entry.id))
        .take(limit)
        .map(|entry| Tip {
            id: entry.id.clone(),
            title: entry.title.clone(),
            explanation: entry.explanation.clone(),
        })
        .collect()
}
