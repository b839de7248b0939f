//! 모든 핸들러에서 공유되는 애플리케이션 상태.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cast_core::{AppConfig, EngineDefaults};

use crate::metrics::set_active_backtests;

/// 애플리케이션 공유 상태.
///
/// Arc로 래핑되어 Axum의 State extractor를 통해 핸들러에 주입됩니다.
#[derive(Debug, Clone)]
pub struct AppState {
    /// 전체 설정
    pub config: Arc<AppConfig>,

    /// 서버 종료 토큰. 실행 중인 백테스트는 자식 토큰으로 취소됩니다.
    pub shutdown: CancellationToken,

    /// 실행 중인 백테스트 수
    active_backtests: Arc<AtomicUsize>,

    /// 서버 시작 시간
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새 상태를 생성합니다.
    pub fn new(config: AppConfig, shutdown: CancellationToken) -> Self {
        Self {
            config: Arc::new(config),
            shutdown,
            active_backtests: Arc::new(AtomicUsize::new(0)),
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 엔진 기본값 및 한도.
    pub fn engine(&self) -> &EngineDefaults {
        &self.config.engine
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
    }

    /// 실행 중인 백테스트 수.
    pub fn active_backtests(&self) -> usize {
        self.active_backtests.load(Ordering::Relaxed)
    }

    /// 백테스트 시작을 기록합니다. 가드가 해제될 때 감소합니다.
    pub fn track_backtest(&self) -> BacktestGuard {
        let count = self.active_backtests.fetch_add(1, Ordering::Relaxed) + 1;
        set_active_backtests(count);
        BacktestGuard {
            counter: Arc::clone(&self.active_backtests),
        }
    }
}

/// 실행 중인 백테스트 수 가드.
#[derive(Debug)]
pub struct BacktestGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for BacktestGuard {
    fn drop(&mut self) {
        let count = self.counter.fetch_sub(1, Ordering::Relaxed) - 1;
        set_active_backtests(count);
    }
}

/// 테스트용 상태 (기본 설정).
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    AppState::new(AppConfig::default(), CancellationToken::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backtest_guard_counts() {
        let state = create_test_state();
        assert_eq!(state.active_backtests(), 0);

        let first = state.track_backtest();
        let second = state.track_backtest();
        assert_eq!(state.active_backtests(), 2);

        drop(first);
        assert_eq!(state.active_backtests(), 1);
        drop(second);
        assert_eq!(state.active_backtests(), 0);
    }

    #[test]
    fn test_engine_defaults_exposed() {
        let state = create_test_state();
        assert_eq!(state.engine().pattern_length, 20);
        assert!(state.uptime_secs() >= 0);
    }
}
