//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 엔진 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # Errors
///
/// 버킷 설정이 잘못되었거나 레코더가 이미 설치되어 있으면 실패합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .set_buckets_for_metric(
            Matcher::Full("backtest_duration_seconds".to_string()),
            &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭 헬퍼 함수
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, route: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "route" => route.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, route: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, route: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 엔진 메트릭 헬퍼 함수
// ============================================================================

/// 패턴 질의 카운터 증가.
pub fn record_pattern_query(method: &str, outcome: &str) {
    counter!(
        "pattern_queries_total",
        "method" => method.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 백테스트 실행 결과 기록 (completed, failed, cancelled).
pub fn record_backtest_run(method: &str, outcome: &str, duration_secs: f64) {
    counter!(
        "backtest_runs_total",
        "method" => method.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("backtest_duration_seconds", "method" => method.to_string()).record(duration_secs);
}

/// 실행 중인 백테스트 수 설정.
pub fn set_active_backtests(count: usize) {
    gauge!("backtests_active").set(count as f64);
}

// ============================================================================
// 라우트 라벨
// ============================================================================

const KNOWN_ROUTES: &[&str] = &[
    "/api/v1/pattern",
    "/api/v1/backtest",
    "/health",
    "/health/ready",
    "/metrics",
];

/// 요청 경로를 메트릭 라벨로 변환합니다.
///
/// 알려진 라우트는 그대로, 그 외 경로는 `other`로 묶어 라벨 카디널리티를 제한합니다.
pub fn route_label(path: &str) -> &'static str {
    let trimmed = match path.trim_end_matches('/') {
        "" => "/",
        p => p,
    };
    KNOWN_ROUTES
        .iter()
        .find(|route| **route == trimmed)
        .copied()
        .unwrap_or("other")
}
