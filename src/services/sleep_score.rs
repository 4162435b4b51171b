use super::AnalyticsError;

const HOURS_WEIGHT: f64 = 10.0;
const MOOD_WEIGHT: f64 = 2.0;

/// Interpretable daily score: `sleep_hours * 10 + mood * 2`.
///
/// Range checks belong to the request boundary; this only refuses values
/// that are not numbers at all.
pub fn compute_score(sleep_hours: f64, mood: i32) -> Result<f64, AnalyticsError> {
    if !sleep_hours.is_finite() {
        return Err(AnalyticsError::InvalidInput(format!(
            "sleep hours must be a number, got {sleep_hours}"
        )));
    }
    Ok(sleep_hours * HOURS_WEIGHT + mood as f64 * MOOD_WEIGHT)
}
