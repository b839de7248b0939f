//! 워크포워드 백테스트 endpoint.
//!
//! 응답은 `application/x-ndjson` 스트림입니다. 진행률 이벤트가 한 줄씩 이어지고
//! 마지막에 결과 또는 에러 이벤트가 옵니다.
//!
//! 백테스트는 `spawn_blocking`에서 실행되며 이벤트는 bounded 채널로 전달됩니다.
//! 클라이언트가 연결을 끊으면 응답 스트림이 해제되면서 취소 토큰이 취소되고,
//! 러너는 다음 테스트 지점 시작 전에 이를 확인해 멈춥니다.

use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn, Instrument};

use cast_core::{engine_span, CastError};
use cast_engine::{eligible_range, BacktestEvent, BacktestRunner, RunState};

use crate::error::{engine_error, json_rejection, validation_error, ApiResult};
use crate::metrics::record_backtest_run;
use crate::state::AppState;
use crate::types::{build_series, BacktestRequest};

/// 이벤트 채널 버퍼 크기.
const EVENT_BUFFER: usize = 64;

/// NDJSON 응답 Content-Type.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// 이벤트를 NDJSON 한 줄로 직렬화합니다.
fn encode_line(event: &BacktestEvent) -> Bytes {
    let mut line = serde_json::to_vec(event).unwrap_or_else(|e| {
        serde_json::to_vec(&BacktestEvent::Error {
            message: format!("이벤트 직렬화 실패: {}", e),
        })
        .unwrap_or_default()
    });
    line.push(b'\n');
    Bytes::from(line)
}

/// 백테스트 실행 (스트리밍).
///
/// POST /api/v1/backtest
///
/// 스트림 시작 전에 실패하는 요청(검증 실패, 평가 가능 지점 없음)은
/// 일반 JSON 에러 응답으로 반환됩니다.
pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BacktestRequest>, JsonRejection>,
) -> ApiResult<Response> {
    use validator::Validate;

    let Json(request) = payload.map_err(json_rejection)?;

    // 입력 유효성 검사
    request.validate().map_err(validation_error)?;
    request
        .check_limits(state.engine())
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))?;

    let series = build_series(&request.data)?;
    let config = request.to_config(state.engine());
    config.validate().map_err(engine_error)?;

    // 평가 가능한 지점이 없으면 스트림을 열지 않음
    if eligible_range(series.len(), config.pattern_length, config.forecast_horizon).is_none() {
        return Err(engine_error(CastError::NoEligibleTestPoints {
            series_len: series.len(),
            pattern_length: config.pattern_length,
            forecast_horizon: config.forecast_horizon,
        }));
    }

    // 서버 종료 또는 클라이언트 연결 해제 시 취소
    let cancel = state.shutdown.child_token();
    let runner = BacktestRunner::new(config).with_cancellation(cancel.clone());
    let run_id = runner.run_id();
    let method = runner.config().method;
    let span = engine_span!("backtest_request", method, runner.config().pattern_length, run_id);

    info!(parent: &span, candles = series.len(), "백테스트 스트림 시작");

    let (tx, rx) = mpsc::channel::<BacktestEvent>(EVENT_BUFFER);
    let guard = state.track_backtest();
    let blocking_span = span.clone();

    tokio::spawn(
        async move {
            let started = Instant::now();
            let status = runner.status();
            let handle = tokio::runtime::Handle::current();
            let cancelled = runner.cancellation_token();
            let joined = tokio::task::spawn_blocking(move || {
                let _entered = blocking_span.enter();
                // 읽지 않는 클라이언트로 채널이 가득 차도 취소(연결 해제, 서버 종료)되면 풀림
                let sink = move |event: BacktestEvent| {
                    handle.block_on(async {
                        tokio::select! {
                            sent = tx.send(event) => sent.is_ok(),
                            _ = cancelled.cancelled() => false,
                        }
                    })
                };
                runner.run(&series, &sink)
            })
            .await;

            let outcome = match (&joined, status.get()) {
                (Err(e), _) => {
                    warn!(error = %e, "백테스트 태스크 실패");
                    "failed"
                }
                (Ok(_), RunState::Completed) => "completed",
                (Ok(_), RunState::Cancelled) => "cancelled",
                (Ok(_), _) => "failed",
            };
            record_backtest_run(method.as_str(), outcome, started.elapsed().as_secs_f64());
            drop(guard);
        }
        .instrument(span),
    );

    // 응답 스트림이 해제되면 drop guard가 취소 토큰을 취소
    let body_stream = stream::unfold((rx, cancel.drop_guard()), |(mut rx, guard)| async move {
        rx.recv()
            .await
            .map(|event| (Ok::<_, Infallible>(encode_line(&event)), (rx, guard)))
    });

    Ok((
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(body_stream),
    )
        .into_response())
}

/// 백테스트 라우터 생성.
pub fn backtest_router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(run_backtest))
}
