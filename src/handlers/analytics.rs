use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::db::DateRange;
use crate::dto::{AnalyticsSummaryResponse, CompareQuery, RollingQuery, RollingResponse, StreakSummary};
use crate::error::{AppError, AppResult};
use crate::household::Household;
use crate::models::sleep_log::SleepLog;
use crate::services::tips;
use crate::services::trends::{self, BeforeAfter};
use crate::AppState;

const MAX_WINDOW: usize = 365;

async fn snapshot(state: &AppState, household: &Household) -> AppResult<Vec<SleepLog>> {
    Ok(state
        .store
        .list_by_household(household.as_str(), DateRange::all())
        .await?)
}

pub async fn get_summary(
    State(state): State<AppState>,
    Extension(household): Extension<Household>,
) -> AppResult<Json<AnalyticsSummaryResponse>> {
    let logs = snapshot(&state, &household).await?;
    let settings = &state.config.analytics;

    let recent = trends::trailing(&logs, settings.tip_lookback_days);
    let summary = AnalyticsSummaryResponse {
        total_days: logs.len(),
        latest_score: logs.last().map(|l| l.sleep_score),
        streak: StreakSummary {
            days: trends::detect_streak(&logs, settings.streak_threshold_hours),
            threshold_hours: settings.streak_threshold_hours,
        },
        variability_hours: trends::variability(&logs),
        predicted_next_sleep: trends::predict_next_sleep(&logs),
        outlook: trends::sleep_outlook(
            &logs,
            settings.tip_lookback_days,
            settings.target_sleep_hours,
        )
        .map(Into::into),
        recent: trends::window_averages(recent).ok(),
        tips: tips::generate_tips(&logs, settings.tip_lookback_days, settings),
        household: household.0,
    };

    tracing::debug!(
        household = %summary.household,
        total_days = summary.total_days,
        streak = summary.streak.days,
        "Analytics summary computed"
    );

    Ok(Json(summary))
}

pub async fn get_rolling(
    State(state): State<AppState>,
    Extension(household): Extension<Household>,
    Query(query): Query<RollingQuery>,
) -> AppResult<Json<RollingResponse>> {
    let window = query
        .window
        .unwrap_or(state.config.analytics.rolling_window_days);
    if window > MAX_WINDOW {
        return Err(AppError::Validation(format!(
            "window must be at most {MAX_WINDOW} days"
        )));
    }

    let logs = snapshot(&state, &household).await?;
    let rolling = trends::rolling_stats(&logs, window)?;

    Ok(Json(RollingResponse {
        window,
        dates: logs.iter().map(|l| l.date).collect(),
        rolling_sleep: rolling.sleep,
        rolling_mood: rolling.mood,
    }))
}

pub async fn get_comparison(
    State(state): State<AppState>,
    Extension(household): Extension<Household>,
    Query(query): Query<CompareQuery>,
) -> AppResult<Json<BeforeAfter>> {
    let logs = snapshot(&state, &household).await?;
    Ok(Json(trends::compare_before_after(&logs, query.pivot)))
}
