//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트는 실패 시 같은 JSON 형식을 반환합니다.
//! 엔진 에러([`CastError`])는 안정적인 코드와 HTTP 상태로 변환됩니다.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::ValidationErrors;

use cast_core::CastError;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "error": "이력 부족: selected_index=3, pattern_length=20",
///   "code": "INSUFFICIENT_HISTORY"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 사람이 읽을 수 있는 에러 메시지
    #[serde(rename = "error")]
    pub message: String,
    /// 에러 코드 (예: "INVALID_INPUT", "VALIDATION_ERROR")
    pub code: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details),
        }
    }

    /// 에러 코드 반환.
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

impl From<&CastError> for ApiErrorResponse {
    fn from(err: &CastError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// 엔진 에러의 HTTP 상태 코드.
pub fn status_for(err: &CastError) -> StatusCode {
    match err {
        CastError::InvalidInput(_)
        | CastError::LengthMismatch { .. }
        | CastError::LimitExceeded { .. } => StatusCode::BAD_REQUEST,
        CastError::InsufficientHistory { .. } | CastError::NoEligibleTestPoints { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CastError::Cancelled | CastError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 엔진 에러 → 핸들러 에러.
pub fn engine_error(err: CastError) -> (StatusCode, Json<ApiErrorResponse>) {
    (status_for(&err), Json(ApiErrorResponse::from(&err)))
}

/// 요청 검증 실패 → 400.
///
/// 필드별 메시지를 `; `로 이어 붙이고, 원본 필드 목록은 `details`에 담습니다.
pub fn validation_error(errors: ValidationErrors) -> (StatusCode, Json<ApiErrorResponse>) {
    let message = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: 유효하지 않은 값", field))
            })
        })
        .collect::<Vec<_>>()
        .join("; ");

    let fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();

    (
        StatusCode::BAD_REQUEST,
        Json(ApiErrorResponse::with_details(
            "VALIDATION_ERROR",
            message,
            serde_json::json!({ "fields": fields }),
        )),
    )
}

/// JSON 본문 파싱 실패 (알 수 없는 method 값 포함) → 원래 상태 코드 유지.
pub fn json_rejection(rejection: JsonRejection) -> (StatusCode, Json<ApiErrorResponse>) {
    (
        rejection.status(),
        Json(ApiErrorResponse::new("INVALID_REQUEST", rejection.body_text())),
    )
}
