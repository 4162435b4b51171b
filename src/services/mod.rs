//! # Sleep analytics engine
//!
//! Pure functions over a household's chronologically ordered sleep logs.
//! Nothing in here touches the store or the network; handlers fetch a
//! snapshot, hand it over, and serialize whatever comes back.

pub mod csv_export;
pub mod sleep_score;
pub mod tips;
pub mod trends;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalyticsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: need at least {required} records, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("No records to analyze")]
    EmptySeries,
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `max - min`, or `EmptySeries` when there is nothing to compare.
pub(crate) fn range(values: &[f64]) -> Result<f64, AnalyticsError> {
    let mut iter = values.iter().copied();
    let first = iter.next().ok_or(AnalyticsError::EmptySeries)?;
    let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    Ok(max - min)
}
