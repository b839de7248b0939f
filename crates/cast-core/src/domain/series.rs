//! 캔들 시계열.
//!
//! `Series`는 타임스탬프 기준으로 정렬되고 중복이 제거된 캔들 시퀀스입니다.
//! 생성 이후에는 읽기 전용이며 엔진은 입력을 변경하지 않습니다.

use crate::domain::Candle;
use crate::error::{CastError, CastResult};

/// 정렬·중복 제거된 캔들 시계열.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    candles: Vec<Candle>,
    closes: Vec<f64>,
}

impl Series {
    /// 캔들 목록으로 시계열을 생성합니다.
    ///
    /// 순서가 어긋난 입력은 타임스탬프 기준으로 정렬하고(안정 정렬),
    /// 같은 타임스탬프는 먼저 들어온 캔들만 남깁니다.
    ///
    /// # Errors
    ///
    /// 입력이 비어 있거나 OHLC 값 중 유한하지 않은 값이 있으면 `InvalidInput`.
    pub fn new(mut candles: Vec<Candle>) -> CastResult<Self> {
        if candles.is_empty() {
            return Err(CastError::invalid_input("시계열이 비어 있습니다"));
        }

        if let Some(position) = candles.iter().position(|c| !c.is_finite()) {
            return Err(CastError::invalid_input(format!(
                "유한하지 않은 가격이 포함되어 있습니다 (row={})",
                position
            )));
        }

        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);

        let closes = candles.iter().map(|c| c.close).collect();
        Ok(Self { candles, closes })
    }

    /// 캔들 수.
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// 항상 false (시계열은 최소 1개의 캔들을 가집니다).
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// 전체 캔들.
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// 종가 열.
    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    /// `[start, end)` 구간의 종가.
    ///
    /// # Errors
    ///
    /// 구간이 시계열 범위를 벗어나면 `InvalidInput`.
    pub fn close_window(&self, start: usize, end: usize) -> CastResult<&[f64]> {
        if start > end || end > self.closes.len() {
            return Err(CastError::invalid_input(format!(
                "구간이 범위를 벗어났습니다: [{}, {}) len={}",
                start,
                end,
                self.closes.len()
            )));
        }
        Ok(&self.closes[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candle(day: i64, close: f64) -> Candle {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day);
        Candle::new(ts, close, close, close, close)
    }

    #[test]
    fn test_empty_series_is_rejected() {
        let err = Series::new(Vec::new()).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_out_of_order_input_is_sorted() {
        let series = Series::new(vec![candle(2, 12.0), candle(0, 10.0), candle(1, 11.0)]).unwrap();
        assert_eq!(series.closes(), &[10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let series = Series::new(vec![
            candle(0, 10.0),
            candle(1, 11.0),
            candle(1, 99.0),
            candle(2, 12.0),
        ])
        .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), &[10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_non_finite_price_is_rejected() {
        let mut bad = candle(1, 11.0);
        bad.low = f64::INFINITY;
        let err = Series::new(vec![candle(0, 10.0), bad]).unwrap_err();
        assert!(matches!(err, CastError::InvalidInput(_)));
    }

    #[test]
    fn test_close_window_bounds() {
        let series = Series::new((0..5).map(|d| candle(d, 10.0 + d as f64)).collect()).unwrap();
        assert_eq!(series.close_window(1, 3).unwrap(), &[11.0, 12.0]);
        assert!(series.close_window(0, 5).is_ok());
        assert!(series.close_window(3, 6).is_err());
        assert!(series.close_window(4, 3).is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_series_is_strictly_ordered(days in proptest::collection::vec(0i64..60, 1..80)) {
            let candles = days.iter().map(|&d| candle(d, 10.0 + d as f64)).collect();
            let series = Series::new(candles).unwrap();

            let mut unique = days.clone();
            unique.sort_unstable();
            unique.dedup();
            proptest::prop_assert_eq!(series.len(), unique.len());
            for pair in series.candles().windows(2) {
                proptest::prop_assert!(pair[0].timestamp < pair[1].timestamp);
            }
        }
    }
}
