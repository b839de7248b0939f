//! 단일 지점 패턴 예측.
//!
//! 패턴 탐색, 매칭별 유사도, 예측 구름을 한 번에 계산합니다.
//! HTTP `/pattern` 응답과 CLI `match` 출력이 이 결과를 그대로 직렬화합니다.

use serde::{Deserialize, Serialize};
use tracing::info;

use cast_core::{engine_span, CastResult, DistanceMethod, Series};

use crate::cloud::{build_cloud, CloudPoint};
use crate::matcher::{find_matches, MatchQuery};
use crate::normalize::normalize;
use crate::similarity::similarity;

/// 유사도가 포함된 매칭.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    /// 구간 시작 인덱스
    pub match_start: usize,
    /// 구간 끝 인덱스 (배타)
    pub match_end: usize,
    /// 거리
    pub distance: f64,
    /// Pearson 기반 유사도 (0~100)
    pub similarity: f64,
}

/// 패턴 예측 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternForecast {
    /// 거리 오름차순 매칭
    pub matches: Vec<ScoredMatch>,
    /// 예측 구름
    pub cloud: Vec<CloudPoint>,
    /// 거리를 계산한 후보 수
    pub total_matches_scanned: usize,
    /// 거리 계산 방식
    pub method: DistanceMethod,
    /// 참조 구간 시작
    pub reference_start: usize,
    /// 참조 구간 끝 (배타)
    pub reference_end: usize,
}

/// 선택 지점의 패턴으로 예측을 생성합니다.
///
/// # Errors
///
/// [`find_matches`]와 [`build_cloud`]의 에러를 그대로 전달합니다.
pub fn forecast(series: &Series, query: &MatchQuery) -> CastResult<PatternForecast> {
    let span = engine_span!("pattern_forecast", query.method, query.pattern_length);
    let _guard = span.enter();

    let result = find_matches(series, query)?;
    let cloud = build_cloud(series, &result.matches, query.forecast_horizon)?;

    let closes = series.closes();
    let reference = normalize(&closes[result.reference_start..result.reference_end])?;

    let mut matches = Vec::with_capacity(result.matches.len());
    for m in &result.matches {
        let candidate = normalize(&closes[m.start_index..m.end_index])?;
        matches.push(ScoredMatch {
            match_start: m.start_index,
            match_end: m.end_index,
            distance: m.distance,
            similarity: similarity(&reference, &candidate),
        });
    }

    info!(
        selected_index = query.selected_index,
        matches = matches.len(),
        scanned = result.total_scanned,
        cloud_steps = cloud.len(),
        "패턴 예측 생성"
    );

    Ok(PatternForecast {
        matches,
        cloud,
        total_matches_scanned: result.total_scanned,
        method: result.method,
        reference_start: result.reference_start,
        reference_end: result.reference_end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchScope;
    use cast_core::Candle;
    use chrono::{Duration, TimeZone, Utc};

    fn series_from(closes: &[f64]) -> Series {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Series::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| Candle::new(base + Duration::days(i as i64), c, c, c, c))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_forecast_response_shape() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0)
            .collect();
        let series = series_from(&closes);
        let query = MatchQuery::new(50, 8, 5, 3);
        let result = forecast(&series, &query).unwrap();

        assert_eq!(result.matches.len(), 3);
        assert_eq!(result.cloud.len(), 5);
        assert_eq!(result.reference_start, 42);
        assert_eq!(result.reference_end, 50);
        assert!(result
            .matches
            .iter()
            .all(|m| (0.0..=100.0).contains(&m.similarity) && m.match_end == m.match_start + 8));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["method"], "euclidean");
        assert!(json["matches"][0]["match_start"].is_number());
        assert!(json["cloud"][0]["num_samples"].is_number());
    }

    #[test]
    fn test_unrestricted_forecast_may_lack_future() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let series = series_from(&closes);
        let query = MatchQuery::new(10, 5, 5, 30).with_scope(MatchScope::Unrestricted);
        let result = forecast(&series, &query).unwrap();

        // 시계열 끝 매칭은 미래가 없어 구름에 기여하지 않음
        assert!(result.matches.iter().any(|m| m.match_end == 30));
        assert_eq!(result.cloud.len(), 5);
        assert!(result.cloud[4].num_samples < result.cloud[0].num_samples);
    }
}
