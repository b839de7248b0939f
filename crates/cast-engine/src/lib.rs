//! # Cast Engine
//!
//! 패턴 매칭 기반 예측 엔진입니다.
//!
//! 과거 가격 시계열에서 선택한 구간(패턴)과 비슷했던 과거 구간을 찾고,
//! 그 이후의 움직임으로 확률적 예측 밴드(prediction cloud)를 만들며,
//! 워크포워드 백테스트로 방법을 검증합니다.
//!
//! # 구성 요소
//!
//! - [`normalize`]: 첫 종가 기준 변화율(%) 정규화
//! - [`distance`]: Euclidean / DTW 거리
//! - [`matcher`]: 슬라이딩 윈도우 상위 K 탐색 (누수 경계 포함)
//! - [`similarity`]: Pearson 기반 0~100 유사도
//! - [`cloud`]: 스텝별 퍼센타일 밴드
//! - [`forecast`]: 단일 지점 예측 (매칭 + 유사도 + 구름)
//! - [`backtest`]: 취소/진행률을 지원하는 워크포워드 백테스트
//!
//! # 예시
//!
//! ```rust,ignore
//! use cast_engine::{forecast, MatchQuery};
//!
//! let query = MatchQuery::new(selected_index, 20, 30, 5);
//! let result = forecast(&series, &query)?;
//! println!("매칭 {}개, 구름 {}스텝", result.matches.len(), result.cloud.len());
//! ```

pub mod backtest;
pub mod cloud;
pub mod distance;
pub mod forecast;
pub mod matcher;
pub mod normalize;
pub mod similarity;

pub use backtest::{
    eligible_range, BacktestCase, BacktestConfig, BacktestEvent, BacktestRunner, BacktestSummary,
    EventSink, NoopSink, RunState, RunStatus, TestSelection,
};
pub use cloud::{build_cloud, percentile, CloudPoint};
pub use distance::{distance, metric_for, DistanceMetric, Dtw, Euclidean};
pub use forecast::{forecast, PatternForecast, ScoredMatch};
pub use matcher::{find_matches, MatchQuery, MatchResult, MatchScope, PatternMatch};
pub use normalize::{normalize, percent_change_from};
pub use similarity::similarity;
