//! 전체 API 라우터 통합 테스트.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use cast_api::{create_api_router, AppState};
use cast_core::AppConfig;

fn wave_records(n: usize) -> Value {
    let rows: Vec<Value> = (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.05;
            json!({
                "date": format!("{}T00:00:00Z", day(i)),
                "open": close, "high": close + 1.0, "low": close - 1.0, "close": close
            })
        })
        .collect();
    Value::Array(rows)
}

fn day(i: usize) -> String {
    let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    (base + chrono::Duration::days(i as i64))
        .format("%Y-%m-%d")
        .to_string()
}

fn state() -> Arc<AppState> {
    Arc::new(AppState::new(AppConfig::default(), CancellationToken::new()))
}

fn app(state: Arc<AppState>) -> Router {
    create_api_router().with_state(state)
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn ndjson_lines(response: axum::response::Response) -> Vec<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_pattern_query_through_full_router() {
    let body = json!({
        "data": wave_records(200),
        "selected_index": 150,
        "pattern_length": 10,
        "forecast_horizon": 5,
        "top_k": 4,
        "method": "dtw"
    });

    let response = app(state())
        .oneshot(post("/api/v1/pattern", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["method"], "dtw");
    assert_eq!(json["reference_start"], 140);
    assert_eq!(json["reference_end"], 150);
    assert_eq!(json["cloud"].as_array().unwrap().len(), 5);

    let matches = json["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 4);
    for m in matches {
        // 선택 지점 이후 데이터를 보지 않음
        assert!(m["match_end"].as_u64().unwrap() + 5 <= 150);
    }
}

#[tokio::test]
async fn test_malformed_json_is_invalid_request() {
    let response = app(state())
        .oneshot(post("/api/v1/pattern", "{\"data\": ["))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_seeded_backtest_is_reproducible() {
    let body = json!({
        "data": wave_records(150),
        "pattern_length": 8,
        "forecast_horizon": 4,
        "top_k": 3,
        "num_tests": 6,
        "seed": 42
    })
    .to_string();

    let mut runs = Vec::new();
    for _ in 0..2 {
        let response = app(state())
            .oneshot(post("/api/v1/backtest", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let lines = ndjson_lines(response).await;
        let last = lines.last().unwrap().clone();
        assert_eq!(last["type"], "result");
        assert_eq!(last["total_tests"], 6);
        runs.push(last);
    }

    let indices = |summary: &Value| -> Vec<u64> {
        summary["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["test_index"].as_u64().unwrap())
            .collect()
    };
    assert_eq!(indices(&runs[0]), indices(&runs[1]));
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn test_dropped_stream_releases_backtest() {
    let state = state();
    let response = app(state.clone())
        .oneshot(post(
            "/api/v1/backtest",
            json!({
                "data": wave_records(600),
                "pattern_length": 20,
                "forecast_horizon": 10,
                "method": "dtw",
                "test_all": true
            })
            .to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 본문을 읽지 않고 연결을 끊음
    drop(response);

    let released = tokio::time::timeout(Duration::from_secs(30), async {
        while state.active_backtests() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(released.is_ok());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = app(state())
        .oneshot(
            Request::builder()
                .uri("/api/v1/unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unread_stream_is_released_on_shutdown() {
    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState::new(AppConfig::default(), shutdown.clone()));
    let response = app(state.clone())
        .oneshot(post(
            "/api/v1/backtest",
            json!({
                "data": wave_records(600),
                "pattern_length": 5,
                "forecast_horizon": 3,
                "test_all": true
            })
            .to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 연결은 유지하되 본문을 읽지 않아 이벤트 채널이 가득 참
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.cancel();

    let released = tokio::time::timeout(Duration::from_secs(30), async {
        while state.active_backtests() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(released.is_ok());
    drop(response);
}
