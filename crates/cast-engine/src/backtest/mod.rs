//! 워크포워드 백테스트.
//!
//! 과거의 여러 지점에서 "그 시점까지의 데이터만으로" 예측 구름을 만들고,
//! 실제 이후 경로와 비교해 방향 적중률과 범위 적중률을 집계합니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use cast_engine::backtest::{BacktestConfig, BacktestRunner, TestSelection};
//!
//! let config = BacktestConfig::new(20, 30)
//!     .with_top_k(5)
//!     .with_selection(TestSelection::All);
//!
//! let runner = BacktestRunner::new(config);
//! let summary = runner.run(&series, &|event| {
//!     println!("{:?}", event);
//!     true
//! })?;
//! println!("방향 적중률: {}%", summary.direction_accuracy);
//! ```

mod events;
mod runner;
mod selection;
mod status;

pub use events::{BacktestEvent, EventSink, NoopSink};
pub use runner::{eligible_range, BacktestRunner};
pub use selection::{TestSelection, DEFAULT_STEP_SIZE};
pub use status::{RunState, RunStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cast_core::{CastError, CastResult, DistanceMethod};

/// 백테스트 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// 패턴 길이
    #[serde(default = "default_pattern_length")]
    pub pattern_length: usize,

    /// 예측 구간
    #[serde(default = "default_forecast_horizon")]
    pub forecast_horizon: usize,

    /// 지점당 사용할 상위 매칭 수
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// 거리 계산 방식
    #[serde(default)]
    pub method: DistanceMethod,

    /// 테스트 지점 선택 방식
    #[serde(default)]
    pub selection: TestSelection,

    /// rayon 워커 풀 병렬 평가 여부
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

// 설정 기본값 함수들 (serde default용)
fn default_pattern_length() -> usize {
    20
}
fn default_forecast_horizon() -> usize {
    30
}
fn default_top_k() -> usize {
    5
}
fn default_parallel() -> bool {
    true
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            pattern_length: default_pattern_length(),
            forecast_horizon: default_forecast_horizon(),
            top_k: default_top_k(),
            method: DistanceMethod::default(),
            selection: TestSelection::default(),
            parallel: default_parallel(),
        }
    }
}

impl BacktestConfig {
    /// 패턴 길이와 예측 구간으로 설정을 생성합니다.
    pub fn new(pattern_length: usize, forecast_horizon: usize) -> Self {
        Self {
            pattern_length,
            forecast_horizon,
            ..Default::default()
        }
    }

    /// 상위 매칭 수 설정.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// 거리 계산 방식 설정.
    pub fn with_method(mut self, method: DistanceMethod) -> Self {
        self.method = method;
        self
    }

    /// 테스트 지점 선택 방식 설정.
    pub fn with_selection(mut self, selection: TestSelection) -> Self {
        self.selection = selection;
        self
    }

    /// 병렬 평가 여부 설정.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// 설정 값을 검증합니다.
    pub fn validate(&self) -> CastResult<()> {
        if self.pattern_length < 2 {
            return Err(CastError::invalid_input(format!(
                "pattern_length는 2 이상이어야 합니다: {}",
                self.pattern_length
            )));
        }
        if self.forecast_horizon < 1 {
            return Err(CastError::invalid_input("forecast_horizon은 1 이상이어야 합니다"));
        }
        if self.top_k < 1 {
            return Err(CastError::invalid_input("top_k는 1 이상이어야 합니다"));
        }
        Ok(())
    }
}

/// 테스트 지점 하나의 평가 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestCase {
    /// 테스트 지점 인덱스
    pub test_index: usize,
    /// 테스트 지점 캔들 시각
    pub date: DateTime<Utc>,
    /// 사용한 매칭 수
    pub matches_found: usize,
    /// 범위 적중률 (0~100, 소수 둘째 자리)
    pub range_accuracy: f64,
    /// 방향 적중 여부
    pub direction_correct: bool,
}

/// 백테스트 요약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    /// 평가한 지점 수
    pub total_tests: usize,
    /// 방향 적중률 (%)
    pub direction_accuracy: f64,
    /// 평균 범위 적중률 (%)
    pub avg_range_accuracy: f64,
    /// 거리 계산 방식
    pub method: DistanceMethod,
    /// 패턴 길이
    pub pattern_length: usize,
    /// 예측 구간
    pub forecast_horizon: usize,
    /// 지점별 결과 (인덱스 오름차순)
    #[serde(rename = "details")]
    pub cases: Vec<BacktestCase>,
}

/// 소수 둘째 자리 반올림.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: BacktestConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BacktestConfig::default());
        assert_eq!(config.selection, TestSelection::Stride { step: 10 });
        assert!(config.parallel);
    }

    #[test]
    fn test_config_validate() {
        assert!(BacktestConfig::new(20, 30).validate().is_ok());
        assert!(BacktestConfig::new(1, 30).validate().is_err());
        assert!(BacktestConfig::new(5, 0).validate().is_err());
        assert!(BacktestConfig::new(5, 5).with_top_k(0).validate().is_err());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(100.0), 100.0);
        assert_eq!(round2(12.344), 12.34);
    }
}
