//! HTTP 요청 metrics middleware.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{record_http_duration, record_http_request, record_http_response, route_label};

/// HTTP 메트릭을 수집하는 미들웨어 레이어.
///
/// 각 요청에 대해 다음 메트릭을 기록합니다:
/// - `http_requests_total`: 총 요청 수 (method, route 라벨)
/// - `http_responses_total`: 총 응답 수 (method, route, status 라벨)
/// - `http_request_duration_seconds`: 응답 헤더까지의 처리 시간
///
/// 스트리밍 백테스트는 헤더 전송 시점까지만 측정되며, 전체 실행 시간은
/// `backtest_duration_seconds`에 따로 기록됩니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().to_string();
    let route = route_label(request.uri().path());

    record_http_request(&method, route);

    let response = next.run(request).await;

    let status = response.status().as_u16();
    record_http_response(&method, route, status);
    record_http_duration(&method, route, start.elapsed().as_secs_f64());

    response
}
