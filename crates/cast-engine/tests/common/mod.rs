//! 통합 테스트 공용 헬퍼.

#![allow(dead_code)]

use cast_core::{Candle, Series};
use chrono::{Duration, TimeZone, Utc};

/// 일봉 종가 목록으로 시계열을 만듭니다.
pub fn series_from(closes: &[f64]) -> Series {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle::new(base + Duration::days(i as i64), c, c * 1.01, c * 0.99, c))
        .collect();
    Series::new(candles).unwrap()
}

/// `100 + i` 선형 상승 시계열.
pub fn ramp(len: usize) -> Series {
    let closes: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
    series_from(&closes)
}

/// 수익률 목록을 누적한 양수 가격 경로.
pub fn price_path(returns: &[f64]) -> Vec<f64> {
    let mut price = 100.0;
    returns
        .iter()
        .map(|r| {
            price *= 1.0 + r;
            price
        })
        .collect()
}
