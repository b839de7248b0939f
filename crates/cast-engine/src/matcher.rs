//! 슬라이딩 윈도우 패턴 탐색.
//!
//! 선택 지점 `q` 직전 `L`개 종가를 참조 패턴으로 삼고, 시계열의 모든 후보 구간
//! `[s, s+L)`을 정규화해 거리 순으로 상위 K개를 고릅니다.
//!
//! # 누수 경계
//!
//! [`MatchScope::Bounded`]에서는 후보 구간과 그 이후 예측 구간 전체
//! `[s, s+L+H)`가 경계 이전에 있어야 합니다. 백테스트는 경계를 테스트 지점으로
//! 두어 미래 정보가 평가에 섞이지 않게 합니다.

use serde::{Deserialize, Serialize};
use tracing::debug;

use cast_core::{CastError, CastResult, DistanceMethod, Series};

use crate::distance::metric_for;
use crate::normalize::normalize;

/// 후보 탐색 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchScope {
    /// 후보와 예측 구간이 모두 경계 이전에 있어야 함 (`s + L + H ≤ boundary`)
    Bounded(usize),
    /// 시계열 전체 (참조 구간과 겹치는 후보만 제외)
    Unrestricted,
}

/// 패턴 탐색 요청.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchQuery {
    /// 참조 패턴의 끝 인덱스 (배타)
    pub selected_index: usize,
    /// 패턴 길이
    pub pattern_length: usize,
    /// 예측 구간
    pub forecast_horizon: usize,
    /// 반환할 최대 매칭 수
    pub top_k: usize,
    /// 거리 계산 방식
    pub method: DistanceMethod,
    /// 탐색 범위
    pub scope: MatchScope,
    /// 서로 겹치지 않는 매칭 우선 선택
    pub distinct: bool,
}

impl MatchQuery {
    /// 새 탐색 요청을 생성합니다.
    ///
    /// 기본 범위는 선택 지점을 경계로 하는 `Bounded(selected_index)`입니다.
    pub fn new(
        selected_index: usize,
        pattern_length: usize,
        forecast_horizon: usize,
        top_k: usize,
    ) -> Self {
        Self {
            selected_index,
            pattern_length,
            forecast_horizon,
            top_k,
            method: DistanceMethod::default(),
            scope: MatchScope::Bounded(selected_index),
            distinct: false,
        }
    }

    /// 거리 계산 방식 설정.
    pub fn with_method(mut self, method: DistanceMethod) -> Self {
        self.method = method;
        self
    }

    /// 탐색 범위 설정.
    pub fn with_scope(mut self, scope: MatchScope) -> Self {
        self.scope = scope;
        self
    }

    /// 겹치지 않는 매칭 우선 선택 설정.
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// 참조 구간 시작 인덱스.
    pub fn reference_start(&self) -> usize {
        self.selected_index.saturating_sub(self.pattern_length)
    }

    fn validate(&self, series_len: usize) -> CastResult<()> {
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
        if self.selected_index > series_len {
            return Err(CastError::invalid_input(format!(
                "selected_index가 범위를 벗어났습니다: {} > {}",
                self.selected_index, series_len
            )));
        }
        if self.selected_index < self.pattern_length {
            return Err(CastError::InsufficientHistory {
                selected_index: self.selected_index,
                pattern_length: self.pattern_length,
            });
        }
        Ok(())
    }
}

/// 매칭된 과거 구간.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// 구간 시작 인덱스
    pub start_index: usize,
    /// 구간 끝 인덱스 (배타, `start_index + L`)
    pub end_index: usize,
    /// 참조 패턴과의 거리 (≥ 0)
    pub distance: f64,
}

/// 패턴 탐색 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// 거리 오름차순 매칭 (최대 K개)
    pub matches: Vec<PatternMatch>,
    /// 거리를 계산한 후보 수
    pub total_scanned: usize,
    /// 참조 구간 시작 (`q - L`)
    pub reference_start: usize,
    /// 참조 구간 끝 (`q`, 배타)
    pub reference_end: usize,
    /// 사용한 거리 방식
    pub method: DistanceMethod,
}

/// 참조 패턴과 가장 가까운 과거 구간을 찾습니다.
///
/// 동일 거리는 시작 인덱스가 작은 쪽이 앞섭니다. 후보가 K개보다 적어도
/// 에러가 아닙니다.
///
/// # Errors
///
/// - `InvalidInput`: `L < 2`, `H < 1`, `K < 1`, `q > len`, 기준 종가 0
/// - `InsufficientHistory`: `q < L`
pub fn find_matches(series: &Series, query: &MatchQuery) -> CastResult<MatchResult> {
    query.validate(series.len())?;

    let closes = series.closes();
    let length = query.pattern_length;
    let reference_start = query.selected_index - length;
    let reference_end = query.selected_index;
    let reference = normalize(&closes[reference_start..reference_end])?;
    let metric = metric_for(query.method);

    // s + L ≤ len, 경계 범위에서는 s + L + H ≤ boundary
    let last_fit = closes.len().checked_sub(length);
    let limit = match query.scope {
        MatchScope::Bounded(boundary) => last_fit
            .zip(boundary.checked_sub(length.saturating_add(query.forecast_horizon)))
            .map(|(fit, bounded)| fit.min(bounded)),
        MatchScope::Unrestricted => last_fit,
    };

    let mut ranked = Vec::new();
    if let Some(last_start) = limit {
        for start in 0..=last_start {
            // 참조 구간과 겹치는 후보 제외 (자기 자신 포함)
            if start < reference_end && start + length > reference_start {
                continue;
            }
            let candidate = normalize(&closes[start..start + length])?;
            let dist = metric.distance(&reference, &candidate)?;
            ranked.push((start, dist));
        }
    }

    let total_scanned = ranked.len();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let matches = select_top(&ranked, length, query.top_k, query.distinct);

    debug!(
        selected_index = query.selected_index,
        total_scanned,
        found = matches.len(),
        "패턴 탐색 완료"
    );

    Ok(MatchResult {
        matches,
        total_scanned,
        reference_start,
        reference_end,
        method: query.method,
    })
}

fn select_top(
    ranked: &[(usize, f64)],
    length: usize,
    top_k: usize,
    distinct: bool,
) -> Vec<PatternMatch> {
    let mut selected: Vec<PatternMatch> = Vec::with_capacity(top_k.min(ranked.len()));

    for &(start, distance) in ranked {
        if selected.len() >= top_k {
            break;
        }
        if distinct
            && selected
                .iter()
                .any(|m| start < m.end_index && start + length > m.start_index)
        {
            continue;
        }
        selected.push(PatternMatch {
            start_index: start,
            end_index: start + length,
            distance,
        });
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use cast_core::Candle;
    use chrono::{Duration, TimeZone, Utc};

    fn series_from(closes: &[f64]) -> Series {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(base + Duration::days(i as i64), c, c, c, c))
            .collect();
        Series::new(candles).unwrap()
    }

    fn zigzag(n: usize) -> Series {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + ((i * 7) % 11) as f64 + (i as f64) * 0.1)
            .collect();
        series_from(&closes)
    }

    #[test]
    fn test_insufficient_history() {
        let series = zigzag(50);
        let err = find_matches(&series, &MatchQuery::new(10, 20, 5, 3)).unwrap_err();
        assert_eq!(
            err,
            CastError::InsufficientHistory {
                selected_index: 10,
                pattern_length: 20
            }
        );
    }

    #[test]
    fn test_invalid_parameters() {
        let series = zigzag(50);
        for query in [
            MatchQuery::new(30, 1, 5, 3),
            MatchQuery::new(30, 5, 0, 3),
            MatchQuery::new(30, 5, 5, 0),
            MatchQuery::new(51, 5, 5, 3),
        ] {
            assert!(matches!(
                find_matches(&series, &query),
                Err(CastError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_bounded_scope_respects_boundary() {
        let series = zigzag(120);
        let query = MatchQuery::new(80, 10, 15, 50);
        let result = find_matches(&series, &query).unwrap();

        assert!(!result.matches.is_empty());
        for m in &result.matches {
            assert!(m.start_index + 10 + 15 <= 80);
            assert_eq!(m.end_index, m.start_index + 10);
        }
        // s ∈ [0, 55], 참조 구간 [70, 80)과 겹치지 않음
        assert_eq!(result.total_scanned, 56);
        assert_eq!(result.reference_start, 70);
        assert_eq!(result.reference_end, 80);
    }

    #[test]
    fn test_unrestricted_scope_excludes_overlap_only() {
        let series = zigzag(60);
        let query = MatchQuery::new(30, 10, 5, 100).with_scope(MatchScope::Unrestricted);
        let result = find_matches(&series, &query).unwrap();

        // 전체 후보 51개 중 [11, 29] 구간 시작 19개가 참조와 겹침
        assert_eq!(result.total_scanned, 51 - 19);
        for m in &result.matches {
            assert!(m.end_index <= 20 || m.start_index >= 30);
        }
    }

    #[test]
    fn test_matches_sorted_with_tie_break() {
        // 상수 구간은 모두 거리 0 → 시작 인덱스 순
        let mut closes = vec![100.0; 40];
        closes.extend((0..10).map(|i| 100.0 + i as f64));
        let series = series_from(&closes);
        let query = MatchQuery::new(40, 5, 3, 4);
        let result = find_matches(&series, &query).unwrap();

        let starts: Vec<usize> = result.matches.iter().map(|m| m.start_index).collect();
        assert_eq!(starts, vec![0, 1, 2, 3]);
        assert!(result.matches.iter().all(|m| m.distance == 0.0));
    }

    #[test]
    fn test_fewer_than_k_is_valid() {
        let series = zigzag(30);
        let query = MatchQuery::new(20, 5, 5, 10);
        let result = find_matches(&series, &query).unwrap();
        // s ≤ 10, 참조 [15, 20)과 겹치는 후보 없음 → 11개
        assert_eq!(result.total_scanned, 11);
        assert_eq!(result.matches.len(), 10);

        let tight = find_matches(&series, &MatchQuery::new(12, 5, 5, 10)).unwrap();
        assert_eq!(tight.total_scanned, 3);
        assert_eq!(tight.matches.len(), 3);
    }

    #[test]
    fn test_distinct_skips_overlapping_matches() {
        let mut closes = vec![100.0; 40];
        closes.extend((0..10).map(|i| 100.0 + i as f64));
        let series = series_from(&closes);
        let query = MatchQuery::new(40, 5, 3, 3).with_distinct(true);
        let result = find_matches(&series, &query).unwrap();

        let starts: Vec<usize> = result.matches.iter().map(|m| m.start_index).collect();
        assert_eq!(starts, vec![0, 5, 10]);
    }
}
