use axum::{extract::State, Json};
use validator::Validate;

use crate::dto::{DailyTipsRequest, TipsResponse};
use crate::error::AppResult;
use crate::services::tips;
use crate::AppState;

/// Catalog tips for a single night, without saving anything.
pub async fn daily_tips(
    State(state): State<AppState>,
    Json(body): Json<DailyTipsRequest>,
) -> AppResult<Json<TipsResponse>> {
    body.validate()?;

    let tips = tips::daily_tips(
        body.sleep_hours,
        body.mood,
        &body.previous_tips,
        &state.tip_catalog,
        state.config.analytics.max_daily_tips,
    );

    Ok(Json(TipsResponse { tips }))
}
