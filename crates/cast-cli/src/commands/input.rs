//! 캔들 입력 파일 로드.
//!
//! 캔들 레코드 배열(`[{date, open, high, low, close}]`)이나 API 요청 본문처럼
//! `data` 필드로 감싼 객체(`{"data": [...]}`)를 모두 받습니다.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use cast_core::{candles_from_records, CandleRecord, Series};

/// 입력 파일 형식.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandleFile {
    Records(Vec<CandleRecord>),
    Wrapped { data: Vec<CandleRecord> },
}

impl CandleFile {
    fn into_records(self) -> Vec<CandleRecord> {
        match self {
            CandleFile::Records(records) => records,
            CandleFile::Wrapped { data } => data,
        }
    }
}

/// JSON 문자열에서 시계열을 만듭니다.
pub fn parse_series(content: &str) -> Result<Series> {
    let file: CandleFile =
        serde_json::from_str(content).context("캔들 JSON 형식이 올바르지 않습니다")?;
    let records = file.into_records();

    let (candles, dropped) = candles_from_records(&records);
    if dropped > 0 {
        warn!(dropped, kept = candles.len(), "날짜를 해석할 수 없는 행 제외");
    }

    Ok(Series::new(candles)?)
}

/// 파일에서 시계열을 로드합니다.
pub fn load_series(path: &Path) -> Result<Series> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("입력 파일을 읽을 수 없습니다: {}", path.display()))?;
    let series = parse_series(&content)?;
    info!(path = %path.display(), candles = series.len(), "Loaded candles");
    Ok(series)
}

/// 결과를 파일로 저장합니다.
///
/// 상위 디렉토리가 없으면 생성합니다.
pub fn save_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)
        .with_context(|| format!("결과를 저장할 수 없습니다: {}", path.display()))?;
    Ok(())
}
