//! 캔들 데이터 타입.
//!
//! - `Candle` - 엔진이 사용하는 OHLC 캔들
//! - `CandleRecord` - 외부(HTTP/CLI)에서 들어오는 원시 캔들 레코드
//!
//! 날짜를 파싱할 수 없는 레코드는 엔진에 도달하기 전에 제외됩니다.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 이 값보다 큰 Unix 타임스탬프는 밀리초 단위로 간주합니다.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// 날짜+시간 문자열 형식 (RFC 3339 이외).
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// OHLC 캔들.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시작 시간
    pub timestamp: DateTime<Utc>,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Candle {
    /// 새 캔들을 생성합니다.
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    /// OHLC 값이 모두 유한한지 확인합니다.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

/// 레코드의 날짜 필드.
///
/// 문자열 또는 Unix 타임스탬프(초/밀리초)를 허용합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordDate {
    /// 날짜 문자열
    Text(String),
    /// Unix 타임스탬프
    Epoch(i64),
}

impl RecordDate {
    /// 타임스탬프로 변환합니다. 파싱할 수 없으면 `None`.
    pub fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            RecordDate::Text(text) => parse_timestamp(text),
            RecordDate::Epoch(value) => from_epoch(*value),
        }
    }
}

/// 외부 입력 캔들 레코드.
///
/// `{ date, open, high, low, close, volume? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleRecord {
    /// 날짜 (문자열 또는 Unix 타임스탬프)
    pub date: RecordDate,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl CandleRecord {
    /// 캔들로 변환합니다. 날짜를 파싱할 수 없으면 `None`.
    pub fn to_candle(&self) -> Option<Candle> {
        let timestamp = self.date.to_timestamp()?;
        Some(Candle {
            timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

/// 레코드 목록을 캔들로 변환합니다.
///
/// 날짜를 파싱할 수 없는 행은 제외하고, 제외된 행 수를 함께 반환합니다.
pub fn candles_from_records(records: &[CandleRecord]) -> (Vec<Candle>, usize) {
    let mut candles = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for (row, record) in records.iter().enumerate() {
        match record.to_candle() {
            Some(candle) => candles.push(candle),
            None => {
                dropped += 1;
                warn!(row, date = ?record.date, "Dropping candle with unparseable date");
            }
        }
    }

    (candles, dropped)
}

/// 날짜 문자열을 UTC 타임스탬프로 파싱합니다.
///
/// 지원 형식: RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD`, 정수 Unix 타임스탬프.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    text.parse::<i64>().ok().and_then(from_epoch)
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() > MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}
