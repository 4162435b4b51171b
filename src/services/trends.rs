use chrono::NaiveDate;
use serde::Serialize;

use super::{mean, range, AnalyticsError};
use crate::models::sleep_log::SleepLog;

/// Fewest points a trend line is fitted to.
pub const MIN_TREND_POINTS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollingSeries {
    pub sleep: Vec<f64>,
    pub mood: Vec<f64>,
}

/// Trailing-window means of sleep hours and mood.
///
/// Index `i` averages the last `min(window, i + 1)` records, so the first
/// value is the first record itself and nothing is dropped at the start.
pub fn rolling_stats(records: &[SleepLog], window: usize) -> Result<RollingSeries, AnalyticsError> {
    if window == 0 {
        return Err(AnalyticsError::InvalidInput(
            "rolling window must be at least 1".into(),
        ));
    }

    let sleep: Vec<f64> = records.iter().map(|r| r.sleep_hours).collect();
    let mood: Vec<f64> = records.iter().map(|r| r.mood as f64).collect();

    Ok(RollingSeries {
        sleep: trailing_means(&sleep, window),
        mood: trailing_means(&mood, window),
    })
}

fn trailing_means(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .filter_map(|i| {
            let start = (i + 1).saturating_sub(window);
            mean(&values[start..=i])
        })
        .collect()
}

/// Spread of sleep hours (`max - min`) over the whole slice.
pub fn variability(records: &[SleepLog]) -> Option<f64> {
    let hours: Vec<f64> = records.iter().map(|r| r.sleep_hours).collect();
    range(&hours).ok()
}

/// Number of most recent consecutive nights at or above `threshold` hours.
pub fn detect_streak(records: &[SleepLog], threshold: f64) -> usize {
    let mut ordered: Vec<&SleepLog> = records.iter().collect();
    ordered.sort_by_key(|r| r.date);

    ordered
        .iter()
        .rev()
        .take_while(|r| r.sleep_hours >= threshold)
        .count()
}

/// Ordinary least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fits a degree-1 line to `(i, values[i])`.
pub fn fit_trend(values: &[f64]) -> Result<LinearFit, AnalyticsError> {
    if values.len() < MIN_TREND_POINTS {
        return Err(AnalyticsError::InsufficientData {
            required: MIN_TREND_POINTS,
            actual: values.len(),
        });
    }

    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let (sxy, sxx) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, y)| {
            let dx = i as f64 - x_mean;
            (sxy + dx * (y - y_mean), sxx + dx * dx)
        });

    let slope = sxy / sxx;
    Ok(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

/// Linear-trend estimate of the next night's sleep, one step past the last
/// record. `None` with fewer than three records.
pub fn predict_next_sleep(records: &[SleepLog]) -> Option<f64> {
    let hours: Vec<f64> = records.iter().map(|r| r.sleep_hours).collect();
    let fit = fit_trend(&hours).ok()?;
    Some(fit.at(hours.len() as f64))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowAverages {
    pub count: usize,
    pub avg_sleep: f64,
    pub avg_mood: f64,
    pub sleep_range: f64,
}

/// Means and spread of a non-empty slice.
pub fn window_averages(records: &[SleepLog]) -> Result<WindowAverages, AnalyticsError> {
    let hours: Vec<f64> = records.iter().map(|r| r.sleep_hours).collect();
    let moods: Vec<f64> = records.iter().map(|r| r.mood as f64).collect();

    let avg_sleep = mean(&hours).ok_or(AnalyticsError::EmptySeries)?;
    let avg_mood = mean(&moods).ok_or(AnalyticsError::EmptySeries)?;

    Ok(WindowAverages {
        count: records.len(),
        avg_sleep,
        avg_mood,
        sleep_range: range(&hours)?,
    })
}

/// Trailing `days` records (or all of them if the history is shorter).
pub fn trailing(records: &[SleepLog], days: usize) -> &[SleepLog] {
    &records[records.len().saturating_sub(days)..]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepOutlook {
    ContinuedShortSleep,
    StableOrImproving,
}

impl SleepOutlook {
    pub fn message(&self) -> &'static str {
        match self {
            SleepOutlook::ContinuedShortSleep => {
                "Prediction and recent average suggest continued short sleep. Consider an earlier bedtime or sleep hygiene steps."
            }
            SleepOutlook::StableOrImproving => "Prediction looks stable or improving.",
        }
    }
}

/// Reads the trend prediction against the recent average: short sleep is
/// expected to continue only when both fall under `target_hours`.
pub fn sleep_outlook(records: &[SleepLog], lookback_days: usize, target_hours: f64) -> Option<SleepOutlook> {
    let predicted = predict_next_sleep(records)?;
    let recent = window_averages(trailing(records, lookback_days)).ok()?;

    if recent.avg_sleep < target_hours && predicted < target_hours {
        Some(SleepOutlook::ContinuedShortSleep)
    } else {
        Some(SleepOutlook::StableOrImproving)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodAverages {
    pub count: usize,
    pub avg_sleep: Option<f64>,
    pub avg_mood: Option<f64>,
}

impl PeriodAverages {
    fn of(records: &[&SleepLog]) -> Self {
        let hours: Vec<f64> = records.iter().map(|r| r.sleep_hours).collect();
        let moods: Vec<f64> = records.iter().map(|r| r.mood as f64).collect();
        Self {
            count: records.len(),
            avg_sleep: mean(&hours),
            avg_mood: mean(&moods),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeforeAfter {
    pub pivot: NaiveDate,
    pub before: PeriodAverages,
    pub after: PeriodAverages,
}

/// Averages before `pivot` (exclusive) and from `pivot` onward.
pub fn compare_before_after(records: &[SleepLog], pivot: NaiveDate) -> BeforeAfter {
    let (after, before): (Vec<&SleepLog>, Vec<&SleepLog>) =
        records.iter().partition(|r| r.date >= pivot);

    BeforeAfter {
        pivot,
        before: PeriodAverages::of(&before),
        after: PeriodAverages::of(&after),
    }
}
