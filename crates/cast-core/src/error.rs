//! 패턴 예측 엔진의 에러 타입.
//!
//! 엔진의 모든 실패는 이 모듈의 [`CastError`]로 보고됩니다.
//! 기본값(0, 빈 결과)으로 조용히 대체하지 않고 명시적인 에러로 경계까지 전달합니다.

use thiserror::Error;

/// 엔진 에러.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CastError {
    /// 잘못된 입력 (빈 시계열, 첫 종가 0, 비유한 값 등)
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// Euclidean 거리 계산 시 길이 불일치
    #[error("길이 불일치: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },

    /// 선택 지점 이전 데이터가 패턴 길이보다 짧음
    #[error("이력 부족: selected_index={selected_index}, pattern_length={pattern_length}")]
    InsufficientHistory {
        selected_index: usize,
        pattern_length: usize,
    },

    /// 백테스트 평가 가능한 지점이 없음
    #[error("평가 가능한 테스트 지점 없음: series_len={series_len}, pattern_length={pattern_length}, forecast_horizon={forecast_horizon}")]
    NoEligibleTestPoints {
        series_len: usize,
        pattern_length: usize,
        forecast_horizon: usize,
    },

    /// 파라미터가 설정 한도를 초과함
    #[error("{field}이(가) 허용 한도를 초과했습니다: {value} > {max}")]
    LimitExceeded {
        field: &'static str,
        value: usize,
        max: usize,
    },

    /// 호출자에 의해 취소됨
    #[error("작업이 취소되었습니다")]
    Cancelled,

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),
}

/// 엔진 작업을 위한 Result 타입.
pub type CastResult<T> = Result<T, CastError>;

impl CastError {
    /// 잘못된 입력 에러를 생성합니다.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CastError::InvalidInput(message.into())
    }

    /// 경계(HTTP, CLI)에서 사용하는 안정적인 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            CastError::InvalidInput(_) => "INVALID_INPUT",
            CastError::LengthMismatch { .. } => "LENGTH_MISMATCH",
            CastError::InsufficientHistory { .. } => "INSUFFICIENT_HISTORY",
            CastError::NoEligibleTestPoints { .. } => "NO_ELIGIBLE_TEST_POINTS",
            CastError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            CastError::Cancelled => "CANCELLED",
            CastError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// 재시도 가능한 에러인지 확인합니다.
    ///
    /// 거리 계산과 집계는 결정적이므로 재시도해도 같은 결과가 나옵니다.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// 호출자 취소로 인한 종료인지 확인합니다.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CastError::Cancelled)
    }
}

impl From<config::ConfigError> for CastError {
    fn from(err: config::ConfigError) -> Self {
        CastError::Config(err.to_string())
    }
}
