use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers;
use crate::household::{self, HOUSEHOLD_HEADER};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz));

    let household_routes = Router::new()
        // Sleep logs
        .route("/api/sleep-logs", post(handlers::sleep_logs::upsert_sleep_log))
        .route("/api/sleep-logs", get(handlers::sleep_logs::list_sleep_logs))
        .route(
            "/api/sleep-logs/recent",
            get(handlers::sleep_logs::recent_sleep_logs),
        )
        .route(
            "/api/sleep-logs/count",
            get(handlers::sleep_logs::count_sleep_logs),
        )
        .route(
            "/api/sleep-logs/export.csv",
            get(handlers::sleep_logs::export_csv),
        )
        // Analytics
        .route("/api/analytics/summary", get(handlers::analytics::get_summary))
        .route("/api/analytics/rolling", get(handlers::analytics::get_rolling))
        .route(
            "/api/analytics/compare",
            get(handlers::analytics::get_comparison),
        )
        // Tips
        .route("/api/tips/daily", post(handlers::tips::daily_tips))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            household::resolve_household,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(household_routes)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = Vec::new();
    match config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => origins.push(origin),
        Err(_) => tracing::warn!(url = %config.frontend_url, "Ignoring unparseable FRONTEND_URL"),
    }
    // In dev, also allow LAN access (e.g. testing from another device)
    if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
        for o in extra.split(',') {
            if let Ok(hv) = o.trim().parse::<HeaderValue>() {
                origins.push(hv);
            }
        }
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(HOUSEHOLD_HEADER),
        ])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AnalyticsSettings;
    use crate::db::MemoryStore;
    use crate::services::tips::TipCatalog;

    fn app() -> Router {
        let config = Config {
            database_url: "memory:".into(),
            db_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            default_household: "default".into(),
            tip_catalog_path: None,
            analytics: AnalyticsSettings::default(),
        };
        build_router(AppState {
            store: Arc::new(MemoryStore::new()),
            config: Arc::new(config),
            tip_catalog: Arc::new(TipCatalog::default()),
        })
    }

    fn post_json(uri: &str, household: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(h) = household {
            builder = builder.header(HOUSEHOLD_HEADER, h);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(uri: &str, household: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(h) = household {
            builder = builder.header(HOUSEHOLD_HEADER, h);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn log_night(app: &Router, household: Option<&str>, date: &str, hours: f64, mood: i32) {
        let res = send(
            app,
            post_json(
                "/api/sleep-logs",
                household,
                json!({ "date": date, "sleep_hours": hours, "mood": mood }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_and_readyz() {
        let app = app();
        let res = send(&app, get_req("/health", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["service"], "sleeplog-api");

        let res = send(&app, get_req("/readyz", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["checks"]["backend"], "memory");
    }

    #[tokio::test]
    async fn test_upsert_returns_score_and_fresh_tips() {
        let app = app();
        let res = send(
            &app,
            post_json(
                "/api/sleep-logs",
                None,
                json!({
                    "date": "2026-03-01",
                    "sleep_hours": 5.5,
                    "mood": 3,
                    "tips_applied": "Reduce screen time"
                }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let body = body_json(res).await;
        assert_eq!(body["household"], "default");
        assert_eq!(body["sleep_score"], 61.0);
        assert_eq!(body["tips_applied"], json!(["reduce_screen_time"]));
        let suggested: Vec<&str> = body["suggested_tips"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap())
            .collect();
        assert_eq!(suggested, vec!["mindfulness_exercise", "try_journaling"]);
    }

    #[tokio::test]
    async fn test_upsert_same_date_twice_keeps_one_row() {
        let app = app();
        log_night(&app, None, "2026-03-01", 6.0, 5).await;
        log_night(&app, None, "2026-03-01", 8.0, 7).await;

        let res = send(&app, get_req("/api/sleep-logs", None)).await;
        let logs = body_json(res).await;
        assert_eq!(logs.as_array().unwrap().len(), 1);
        assert_eq!(logs[0]["sleep_hours"], 8.0);
        assert_eq!(logs[0]["sleep_score"], 94.0);

        let res = send(&app, get_req("/api/sleep-logs/count", None)).await;
        assert_eq!(body_json(res).await["total_days"], 1);
    }

    #[tokio::test]
    async fn test_out_of_range_values_are_rejected() {
        let app = app();
        for body in [
            json!({ "sleep_hours": 25.0, "mood": 5 }),
            json!({ "sleep_hours": 7.0, "mood": 11 }),
            json!({ "sleep_hours": 7.0, "mood": 0 }),
        ] {
            let res = send(&app, post_json("/api/sleep-logs", None, body)).await;
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body_json(res).await["error"]["code"], 422);
        }

        let res = send(&app, get_req("/api/sleep-logs/count", None)).await;
        assert_eq!(body_json(res).await["total_days"], 0);
    }

    #[tokio::test]
    async fn test_households_are_partitioned() {
        let app = app();
        log_night(&app, Some("smiths"), "2026-03-01", 6.0, 5).await;
        log_night(&app, Some("smiths"), "2026-03-02", 7.0, 5).await;
        log_night(&app, Some("joneses"), "2026-03-01", 9.0, 8).await;

        let res = send(&app, get_req("/api/sleep-logs/count", Some("smiths"))).await;
        assert_eq!(body_json(res).await["total_days"], 2);
        let res = send(&app, get_req("/api/sleep-logs/count", Some("joneses"))).await;
        assert_eq!(body_json(res).await["total_days"], 1);
        let res = send(&app, get_req("/api/sleep-logs/count", None)).await;
        assert_eq!(body_json(res).await["total_days"], 0);

        let res = send(&app, get_req("/api/sleep-logs", Some("bad key!"))).await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_list_range_and_recent() {
        let app = app();
        for (date, hours) in [("2026-03-01", 6.0), ("2026-03-02", 7.0), ("2026-03-03", 8.0)] {
            log_night(&app, None, date, hours, 5).await;
        }

        let res = send(
            &app,
            get_req("/api/sleep-logs?start_date=2026-03-02&end_date=2026-03-03", None),
        )
        .await;
        let logs = body_json(res).await;
        assert_eq!(logs.as_array().unwrap().len(), 2);
        assert_eq!(logs[0]["date"], "2026-03-02");

        let res = send(
            &app,
            get_req("/api/sleep-logs?start_date=2026-03-03&end_date=2026-03-01", None),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = send(&app, get_req("/api/sleep-logs/recent?limit=2", None)).await;
        let logs = body_json(res).await;
        assert_eq!(logs.as_array().unwrap().len(), 2);
        assert_eq!(logs[0]["date"], "2026-03-03");
    }

    #[tokio::test]
    async fn test_summary_for_rising_week() {
        let app = app();
        for (date, hours) in [("2026-03-01", 6.0), ("2026-03-02", 7.0), ("2026-03-03", 8.0)] {
            log_night(&app, None, date, hours, 7).await;
        }

        let res = send(&app, get_req("/api/analytics/summary", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let summary = body_json(res).await;
        assert_eq!(summary["total_days"], 3);
        assert_eq!(summary["predicted_next_sleep"], 9.0);
        assert_eq!(summary["variability_hours"], 2.0);
        assert_eq!(summary["streak"]["days"], 2);
        assert_eq!(summary["latest_score"], 94.0);
        assert_eq!(summary["outlook"]["kind"], "stable_or_improving");
        assert_eq!(summary["tips"][0]["id"], "sufficient_sleep");
    }

    #[tokio::test]
    async fn test_summary_without_data() {
        let app = app();
        let res = send(&app, get_req("/api/analytics/summary", None)).await;
        let summary = body_json(res).await;
        assert_eq!(summary["total_days"], 0);
        assert!(summary["predicted_next_sleep"].is_null());
        assert!(summary["variability_hours"].is_null());
        assert!(summary["outlook"].is_null());
        assert_eq!(summary["streak"]["days"], 0);
        assert_eq!(summary["tips"][0]["id"], "no_data");
    }

    #[tokio::test]
    async fn test_rolling_endpoint() {
        let app = app();
        for (date, hours) in [("2026-03-01", 4.0), ("2026-03-02", 6.0), ("2026-03-03", 8.0)] {
            log_night(&app, None, date, hours, 5).await;
        }

        let res = send(&app, get_req("/api/analytics/rolling?window=2", None)).await;
        let body = body_json(res).await;
        assert_eq!(body["window"], 2);
        assert_eq!(body["rolling_sleep"], json!([4.0, 5.0, 7.0]));
        assert_eq!(body["rolling_mood"], json!([5.0, 5.0, 5.0]));
        assert_eq!(body["dates"][2], "2026-03-03");

        let res = send(&app, get_req("/api/analytics/rolling?window=0", None)).await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_compare_endpoint() {
        let app = app();
        for (date, hours) in [("2026-03-01", 5.0), ("2026-03-02", 6.0), ("2026-03-03", 8.0)] {
            log_night(&app, None, date, hours, 5).await;
        }

        let res = send(&app, get_req("/api/analytics/compare?pivot=2026-03-03", None)).await;
        let body = body_json(res).await;
        assert_eq!(body["before"]["count"], 2);
        assert_eq!(body["before"]["avg_sleep"], 5.5);
        assert_eq!(body["after"]["count"], 1);
        assert_eq!(body["after"]["avg_sleep"], 8.0);
    }

    #[tokio::test]
    async fn test_csv_export() {
        let app = app();
        log_night(&app, None, "2026-03-02", 7.5, 6).await;
        log_night(&app, None, "2026-03-01", 8.0, 7).await;

        let res = send(&app, get_req("/api/sleep-logs/export.csv", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv"));

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(
            csv,
            "date,sleep_hours,mood,tips_applied,sleep_score\n\
             2026-03-01,8.0,7,,94.0\n\
             2026-03-02,7.5,6,,87.0\n"
        );
    }

    #[tokio::test]
    async fn test_daily_tips_endpoint() {
        let app = app();
        let res = send(
            &app,
            post_json(
                "/api/tips/daily",
                None,
                json!({ "sleep_hours": 10.0, "mood": 9, "previous_tips": ["avoid_oversleeping"] }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        let ids: Vec<&str> = body["tips"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["keep_good_habits", "try_journaling"]);
    }
}
