//! 예측 구름(prediction cloud) 생성.
//!
//! 각 매칭 구간 이후 최대 H개 종가를 매칭 마지막 종가(`end_index - 1`) 기준
//! 변화율로 바꾸고, 스텝마다 매칭들에 걸친 최소/25%/중앙/75%/최대를 집계합니다.

use serde::{Deserialize, Serialize};

use cast_core::{CastResult, Series};

use crate::matcher::PatternMatch;
use crate::normalize::percent_change_from;

/// 예측 구름의 한 스텝.
///
/// 불변식: `min ≤ p25 ≤ median ≤ p75 ≤ max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloudPoint {
    /// 예측 스텝 (1부터)
    pub step: usize,
    /// 최소값 (%)
    pub min: f64,
    /// 25 퍼센타일 (%)
    pub p25: f64,
    /// 중앙값 (%)
    pub median: f64,
    /// 75 퍼센타일 (%)
    pub p75: f64,
    /// 최대값 (%)
    pub max: f64,
    /// 이 스텝에 기여한 매칭 수
    pub num_samples: usize,
}

/// 정렬된 표본의 선형 보간 퍼센타일.
///
/// 순위 `r = p/100 · (n-1)`에서 인접한 두 순서 통계량을 보간합니다.
/// 빈 표본은 `None`.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (p.clamp(0.0, 100.0) / 100.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + weight * (sorted[upper] - sorted[lower]))
}

/// 매칭 목록으로 예측 구름을 생성합니다.
///
/// 데이터가 모자란 매칭은 더 적은 스텝에만 기여하며, 구름은 기여 매칭이
/// 없는 첫 스텝에서 끝납니다. 빈 매칭 목록은 빈 구름을 만듭니다.
///
/// # Errors
///
/// 기준 종가가 0이면 `InvalidInput`.
pub fn build_cloud(
    series: &Series,
    matches: &[PatternMatch],
    forecast_horizon: usize,
) -> CastResult<Vec<CloudPoint>> {
    let closes = series.closes();

    let mut paths = Vec::with_capacity(matches.len());
    for m in matches {
        if m.end_index == 0 || m.end_index > closes.len() {
            continue;
        }
        let base = closes[m.end_index - 1];
        let end = m.end_index.saturating_add(forecast_horizon).min(closes.len());
        paths.push(percent_change_from(base, &closes[m.end_index..end])?);
    }

    // 스텝 수는 남은 데이터 길이를 넘지 못함
    let mut cloud = Vec::with_capacity(forecast_horizon.min(closes.len()));
    let mut values = Vec::with_capacity(paths.len());

    for step in 1..=forecast_horizon {
        values.clear();
        values.extend(paths.iter().filter_map(|p| p.get(step - 1).copied()));
        if values.is_empty() {
            break;
        }
        values.sort_by(f64::total_cmp);

        let (Some(p25), Some(median), Some(p75)) = (
            percentile(&values, 25.0),
            percentile(&values, 50.0),
            percentile(&values, 75.0),
        ) else {
            break;
        };

        cloud.push(CloudPoint {
            step,
            min: values[0],
            p25,
            median,
            p75,
            max: values[values.len() - 1],
            num_samples: values.len(),
        });
    }

    Ok(cloud)
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn matched(start: usize, end: usize) -> PatternMatch {
        PatternMatch {
            start_index: start,
            end_index: end,
            distance: 0.0,
        }
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile(&sorted, 100.0), Some(4.0));
        assert_eq!(percentile(&sorted, 50.0), Some(2.5));
        assert_eq!(percentile(&sorted, 25.0), Some(1.75));
        assert_eq!(percentile(&[7.0], 75.0), Some(7.0));
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn test_cloud_rebases_on_last_match_close() {
        // 매칭 [0, 2): 기준 종가 closes[1] = 100
        let series = series_from(&[90.0, 100.0, 110.0, 120.0]);
        let cloud = build_cloud(&series, &[matched(0, 2)], 2).unwrap();

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud[0].step, 1);
        assert!((cloud[0].median - 10.0).abs() < 1e-12);
        assert!((cloud[1].median - 20.0).abs() < 1e-12);
        assert_eq!(cloud[1].num_samples, 1);
    }

    #[test]
    fn test_short_matches_contribute_fewer_steps() {
        let series = series_from(&[100.0, 100.0, 101.0, 102.0, 103.0, 104.0]);
        let matches = [matched(0, 2), matched(2, 5)];
        let cloud = build_cloud(&series, &matches, 4).unwrap();

        // 두 번째 매칭은 스텝 1만 기여, 첫 번째 매칭은 4스텝 모두 기여
        assert_eq!(cloud.len(), 4);
        assert_eq!(cloud[0].num_samples, 2);
        assert_eq!(cloud[1].num_samples, 1);
    }

    #[test]
    fn test_cloud_stops_at_first_empty_step() {
        let series = series_from(&[100.0, 101.0, 102.0]);
        let cloud = build_cloud(&series, &[matched(0, 2)], 5).unwrap();
        assert_eq!(cloud.len(), 1);
    }

    #[test]
    fn test_empty_matches_yield_empty_cloud() {
        let series = series_from(&[100.0, 101.0]);
        assert!(build_cloud(&series, &[], 5).unwrap().is_empty());
    }

    #[test]
    fn test_cloud_band_ordering() {
        let series = series_from(&[
            100.0, 100.0, 103.0, 100.0, 95.0, 100.0, 100.0, 110.0, 100.0, 101.0,
        ]);
        let matches = [matched(0, 2), matched(2, 4), matched(4, 6), matched(7, 9)];
        let cloud = build_cloud(&series, &matches, 1).unwrap();

        let point = cloud[0];
        assert_eq!(point.num_samples, 4);
        assert!(point.min <= point.p25);
        assert!(point.p25 <= point.median);
        assert!(point.median <= point.p75);
        assert!(point.p75 <= point.max);
    }
}
