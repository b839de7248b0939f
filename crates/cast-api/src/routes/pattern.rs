//! 패턴 예측 endpoint.
//!
//! 선택 지점 직전 패턴과 비슷한 과거 구간을 찾아 매칭 목록과 예측 구름을 반환합니다.
//! 계산은 `spawn_blocking`으로 blocking thread pool에서 실행합니다.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tracing::{debug, warn};
use validator::Validate;

use cast_engine::{forecast, PatternForecast};

use crate::error::{engine_error, json_rejection, validation_error, ApiErrorResponse, ApiResult};
use crate::metrics::record_pattern_query;
use crate::state::AppState;
use crate::types::{build_series, PatternRequest};

/// 패턴 예측 실행.
///
/// POST /api/v1/pattern
pub async fn query_pattern(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PatternRequest>, JsonRejection>,
) -> ApiResult<Json<PatternForecast>> {
    let Json(request) = payload.map_err(json_rejection)?;

    // 입력 유효성 검사
    request.validate().map_err(validation_error)?;
    request
        .check_limits(state.engine())
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))?;

    let series = build_series(&request.data)?;
    let query = request.to_query(state.engine());
    let method = query.method;

    debug!(
        candles = series.len(),
        selected_index = query.selected_index,
        pattern_length = query.pattern_length,
        method = %method,
        "패턴 예측 요청"
    );

    // CPU-intensive 작업을 blocking thread pool에서 실행
    let outcome = tokio::task::spawn_blocking(move || forecast(&series, &query))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::new(
                    "INTERNAL_ERROR",
                    format!("패턴 예측 태스크 실패: {}", e),
                )),
            )
        })?;

    match outcome {
        Ok(result) => {
            record_pattern_query(method.as_str(), "ok");
            Ok(Json(result))
        }
        Err(err) => {
            record_pattern_query(method.as_str(), "error");
            warn!(error = %err, code = err.code(), "패턴 예측 실패");
            Err(engine_error(err))
        }
    }
}

/// 패턴 라우터 생성.
pub fn pattern_router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(query_pattern))
}
