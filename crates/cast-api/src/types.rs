//! 요청 타입 및 입력 검증.
//!
//! 필드 단위 규칙은 `validator` derive로, 설정 기반 한도는
//! [`check_limits`](PatternRequest::check_limits)로 검사합니다.

use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::warn;
use validator::{Validate, ValidationError};

use cast_core::{
    candles_from_records, CandleRecord, CastError, DistanceMethod, EngineDefaults, Series,
};
use cast_engine::{BacktestConfig, MatchQuery, MatchScope, TestSelection};

use crate::error::{engine_error, ApiErrorResponse};

/// 캔들 레코드 목록 검증.
///
/// 종가 검사는 날짜 해석 이후 [`build_series`]에서 합니다.
fn validate_records(records: &[CandleRecord]) -> Result<(), ValidationError> {
    if records.is_empty() {
        return Err(ValidationError::new("data_empty").with_message("data가 비어 있습니다".into()));
    }
    Ok(())
}

/// 패턴 질의 요청.
///
/// POST /api/v1/pattern
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PatternRequest {
    /// 캔들 데이터
    #[validate(custom(function = "validate_records"))]
    pub data: Vec<CandleRecord>,

    /// 참조 패턴 끝 인덱스 (배타)
    pub selected_index: usize,

    /// 패턴 길이 (기본 20)
    #[validate(range(min = 2, message = "pattern_length는 2 이상이어야 합니다"))]
    pub pattern_length: Option<usize>,

    /// 예측 구간 (기본 30)
    #[validate(range(min = 1, message = "forecast_horizon은 1 이상이어야 합니다"))]
    pub forecast_horizon: Option<usize>,

    /// 상위 매칭 수 (기본 5)
    #[validate(range(min = 1, message = "top_k는 1 이상이어야 합니다"))]
    pub top_k: Option<usize>,

    /// 거리 계산 방식 (기본 euclidean)
    pub method: Option<DistanceMethod>,

    /// 선택 지점 이후 구간도 후보로 허용
    #[serde(default)]
    pub unrestricted: bool,

    /// 서로 겹치지 않는 매칭 우선
    #[serde(default)]
    pub distinct: bool,
}

impl PatternRequest {
    /// 설정 한도를 검사합니다.
    pub fn check_limits(&self, limits: &EngineDefaults) -> Result<(), ApiErrorResponse> {
        check_common_limits(
            self.data.len(),
            self.pattern_length,
            self.forecast_horizon,
            self.top_k,
            limits,
        )
    }

    /// 설정 기본값을 적용한 탐색 요청.
    pub fn to_query(&self, defaults: &EngineDefaults) -> MatchQuery {
        let scope = if self.unrestricted {
            MatchScope::Unrestricted
        } else {
            MatchScope::Bounded(self.selected_index)
        };

        MatchQuery::new(
            self.selected_index,
            self.pattern_length.unwrap_or(defaults.pattern_length),
            self.forecast_horizon.unwrap_or(defaults.forecast_horizon),
            self.top_k.unwrap_or(defaults.top_k),
        )
        .with_method(self.method.unwrap_or(defaults.method))
        .with_scope(scope)
        .with_distinct(self.distinct)
    }
}

/// 백테스트 요청.
///
/// POST /api/v1/backtest
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BacktestRequest {
    /// 캔들 데이터
    #[validate(custom(function = "validate_records"))]
    pub data: Vec<CandleRecord>,

    /// 패턴 길이 (기본 20)
    #[validate(range(min = 2, message = "pattern_length는 2 이상이어야 합니다"))]
    pub pattern_length: Option<usize>,

    /// 예측 구간 (기본 30)
    #[validate(range(min = 1, message = "forecast_horizon은 1 이상이어야 합니다"))]
    pub forecast_horizon: Option<usize>,

    /// 상위 매칭 수 (기본 5)
    #[validate(range(min = 1, message = "top_k는 1 이상이어야 합니다"))]
    pub top_k: Option<usize>,

    /// 거리 계산 방식 (기본 euclidean)
    pub method: Option<DistanceMethod>,

    /// 무작위 추출할 테스트 지점 수
    #[validate(range(min = 1, message = "num_tests는 1 이상이어야 합니다"))]
    pub num_tests: Option<usize>,

    /// 모든 지점 평가
    #[serde(default)]
    pub test_all: bool,

    /// 간격 방식의 간격 (기본 10)
    #[validate(range(min = 1, message = "step_size는 1 이상이어야 합니다"))]
    pub step_size: Option<usize>,

    /// 추출 시드
    pub seed: Option<u64>,
}

impl BacktestRequest {
    /// 설정 한도를 검사합니다.
    pub fn check_limits(&self, limits: &EngineDefaults) -> Result<(), ApiErrorResponse> {
        check_common_limits(
            self.data.len(),
            self.pattern_length,
            self.forecast_horizon,
            self.top_k,
            limits,
        )
    }

    /// 설정 기본값을 적용한 백테스트 설정.
    pub fn to_config(&self, defaults: &EngineDefaults) -> BacktestConfig {
        let selection = TestSelection::from_request(
            self.test_all,
            self.num_tests,
            self.step_size.unwrap_or(defaults.step_size),
            self.seed,
        );

        BacktestConfig::new(
            self.pattern_length.unwrap_or(defaults.pattern_length),
            self.forecast_horizon.unwrap_or(defaults.forecast_horizon),
        )
        .with_top_k(self.top_k.unwrap_or(defaults.top_k))
        .with_method(self.method.unwrap_or(defaults.method))
        .with_selection(selection)
        .with_parallel(defaults.parallel)
    }
}

fn check_common_limits(
    candles: usize,
    pattern_length: Option<usize>,
    forecast_horizon: Option<usize>,
    top_k: Option<usize>,
    limits: &EngineDefaults,
) -> Result<(), ApiErrorResponse> {
    limits
        .check_limits(candles, pattern_length, forecast_horizon, top_k)
        .map_err(|err| match err {
            CastError::LimitExceeded { field, max, .. } => ApiErrorResponse::with_details(
                err.code(),
                err.to_string(),
                serde_json::json!({ "field": field, "max": max }),
            ),
            other => ApiErrorResponse::from(&other),
        })
}

/// 레코드를 시계열로 변환합니다.
///
/// 날짜를 해석할 수 없는 행은 제외되고, 남은 행의 종가는 유한한 양수여야 합니다.
pub fn build_series(
    records: &[CandleRecord],
) -> Result<Series, (StatusCode, Json<ApiErrorResponse>)> {
    let (candles, dropped) = candles_from_records(records);
    if dropped > 0 {
        warn!(dropped, kept = candles.len(), "날짜를 해석할 수 없는 행 제외");
    }

    if candles.iter().any(|c| !c.close.is_finite() || c.close <= 0.0) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiErrorResponse::with_details(
                "VALIDATION_ERROR",
                "종가는 유한한 양수여야 합니다",
                serde_json::json!({ "fields": ["data"] }),
            )),
        ));
    }

    Series::new(candles).map_err(engine_error)
}
