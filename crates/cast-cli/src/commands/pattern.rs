//! 패턴 예측 명령어.
//!
//! 선택한 지점 직전 구간과 닮은 과거 구간을 찾고 예측 구름을 출력합니다.
//!
//! # 사용 예시
//!
//! ```bash
//! # 인덱스 250 기준, 기본 파라미터
//! cast match -i data/spy_daily.json --index 250
//!
//! # DTW, 서로 겹치지 않는 매칭 10개
//! cast match -i data/spy_daily.json --index 250 -k 10 --method dtw --distinct
//! ```

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use cast_core::{CastResult, DistanceMethod, EngineDefaults, Series};
use cast_engine::{forecast, MatchQuery, MatchScope, PatternForecast};

use super::input::{load_series, save_output};

/// 패턴 예측 CLI 설정
#[derive(Debug, Clone, Default)]
pub struct MatchCliConfig {
    /// 캔들 JSON 파일 경로
    pub input: PathBuf,
    /// 선택 지점
    pub selected_index: usize,
    /// 패턴 길이 (미지정 시 설정 기본값)
    pub pattern_length: Option<usize>,
    /// 예측 구간
    pub forecast_horizon: Option<usize>,
    /// 상위 매칭 수
    pub top_k: Option<usize>,
    /// 거리 계산 방식
    pub method: Option<DistanceMethod>,
    /// 선택 지점 이후 구간까지 탐색
    pub unrestricted: bool,
    /// 서로 겹치지 않는 매칭 우선
    pub distinct: bool,
    /// 결과 저장 경로 (옵션)
    pub output: Option<PathBuf>,
}

impl MatchCliConfig {
    /// 지정된 파라미터를 설정 한도와 비교합니다.
    pub fn check_limits(&self, candles: usize, limits: &EngineDefaults) -> CastResult<()> {
        limits.check_limits(candles, self.pattern_length, self.forecast_horizon, self.top_k)
    }

    /// 설정 기본값을 채워 탐색 요청을 만듭니다.
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

/// 로드된 시계열로 예측을 계산합니다.
///
/// 서버와 같은 한도를 적용합니다.
pub fn match_series(
    series: &Series,
    config: &MatchCliConfig,
    defaults: &EngineDefaults,
) -> Result<PatternForecast> {
    config.check_limits(series.len(), defaults)?;
    let query = config.to_query(defaults);
    let result = forecast(series, &query)?;

    info!(
        matches = result.matches.len(),
        scanned = result.total_matches_scanned,
        method = %result.method,
        "Pattern forecast completed"
    );

    Ok(result)
}

/// 패턴 예측 실행.
///
/// JSON 결과를 표준 출력으로 내보내거나 `output` 경로에 저장합니다.
pub fn run_match(config: &MatchCliConfig, defaults: &EngineDefaults) -> Result<PatternForecast> {
    let series = load_series(&config.input)?;
    let result = match_series(&series, config, defaults)?;
    let json = serde_json::to_string_pretty(&result)?;

    match &config.output {
        Some(path) => {
            save_output(path, &json)?;
            println!("결과 저장 위치: {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(result)
}
