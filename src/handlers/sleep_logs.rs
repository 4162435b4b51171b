use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use validator::Validate;

use crate::db::DateRange;
use crate::dto::{CountResponse, SavedSleepLogResponse};
use crate::error::{AppError, AppResult};
use crate::household::Household;
use crate::models::sleep_log::{NewSleepLog, RecentQuery, SleepLog, SleepLogQuery, UpsertSleepLogRequest};
use crate::services::{csv_export, sleep_score, tips};
use crate::AppState;

const DEFAULT_RECENT: usize = 30;
const MAX_RECENT: usize = 365;

pub async fn upsert_sleep_log(
    State(state): State<AppState>,
    Extension(household): Extension<Household>,
    Json(body): Json<UpsertSleepLogRequest>,
) -> AppResult<Json<SavedSleepLogResponse>> {
    body.validate()?;

    let date = body.date.unwrap_or_else(|| Utc::now().date_naive());
    let score = sleep_score::compute_score(body.sleep_hours, body.mood)?;

    let log = state
        .store
        .upsert(&NewSleepLog {
            household: household.0.clone(),
            date,
            sleep_hours: body.sleep_hours,
            mood: body.mood,
            tips_applied: body.tips_applied,
            sleep_score: score,
        })
        .await?;

    tracing::info!(
        household = %household.as_str(),
        date = %log.date,
        sleep_hours = log.sleep_hours,
        mood = log.mood,
        score = log.sleep_score,
        tips_applied = log.tips_applied.len(),
        "Sleep log saved"
    );
    if !log.tips_applied.is_empty() {
        tracing::debug!(tips = %log.tips_applied.joined(), "Applied tips recorded");
    }

    let suggested_tips = tips::daily_tips(
        log.sleep_hours,
        log.mood,
        &log.tips_applied,
        &state.tip_catalog,
        state.config.analytics.max_daily_tips,
    );

    Ok(Json(SavedSleepLogResponse {
        log,
        suggested_tips,
    }))
}

pub async fn list_sleep_logs(
    State(state): State<AppState>,
    Extension(household): Extension<Household>,
    Query(query): Query<SleepLogQuery>,
) -> AppResult<Json<Vec<SleepLog>>> {
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(AppError::Validation(
                "start_date must not be after end_date".into(),
            ));
        }
    }

    let range = DateRange {
        start: query.start_date,
        end: query.end_date,
    };
    let logs = state
        .store
        .list_by_household(household.as_str(), range)
        .await?;

    Ok(Json(logs))
}

pub async fn recent_sleep_logs(
    State(state): State<AppState>,
    Extension(household): Extension<Household>,
    Query(query): Query<RecentQuery>,
) -> AppResult<Json<Vec<SleepLog>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT).clamp(1, MAX_RECENT);

    let logs = state
        .store
        .list_recent(household.as_str(), limit as i64)
        .await?;

    Ok(Json(logs))
}

pub async fn count_sleep_logs(
    State(state): State<AppState>,
    Extension(household): Extension<Household>,
) -> AppResult<Json<CountResponse>> {
    let total_days = state.store.count(household.as_str()).await?;

    Ok(Json(CountResponse {
        household: household.0,
        total_days,
    }))
}

pub async fn export_csv(
    State(state): State<AppState>,
    Extension(household): Extension<Household>,
) -> AppResult<impl IntoResponse> {
    let logs = state
        .store
        .list_by_household(household.as_str(), DateRange::all())
        .await?;

    tracing::info!(household = %household.as_str(), rows = logs.len(), "Exporting sleep logs");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"sleep_logs.csv\"",
            ),
        ],
        csv_export::to_csv(&logs),
    ))
}
