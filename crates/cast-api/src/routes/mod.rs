//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/v1/pattern` - 단일 지점 패턴 예측
//! - `/api/v1/backtest` - 워크포워드 백테스트 (NDJSON 스트리밍)

pub mod backtest;
pub mod health;
pub mod pattern;

pub use backtest::{backtest_router, run_backtest};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use pattern::{pattern_router, query_pattern};

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        // 헬스 체크 엔드포인트
        .nest("/health", health_router())
        // API v1 엔드포인트
        .nest("/api/v1/pattern", pattern_router())
        .nest("/api/v1/backtest", backtest_router())
}
