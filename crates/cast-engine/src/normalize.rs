//! 종가 정규화.
//!
//! 패턴 비교는 절대 가격이 아닌 첫 종가 대비 변화율(%)로 수행합니다.
//! 가격 수준이 다른 구간끼리도 모양만으로 비교할 수 있게 됩니다.

use cast_core::{CastError, CastResult};

/// 첫 값 대비 변화율(%)로 정규화합니다.
///
/// `out[i] = (values[i] - values[0]) / values[0] * 100`
///
/// # Errors
///
/// 입력이 비어 있거나 첫 값이 0이면 `InvalidInput`.
pub fn normalize(values: &[f64]) -> CastResult<Vec<f64>> {
    let first = values
        .first()
        .copied()
        .ok_or_else(|| CastError::invalid_input("정규화할 값이 비어 있습니다"))?;

    percent_change_from(first, values)
}

/// 임의의 기준값 대비 변화율(%)을 계산합니다.
///
/// 예측 구름과 백테스트 실제 경로처럼 기준 종가가 구간 밖에 있을 때 사용합니다.
///
/// # Errors
///
/// 기준값이 0이면 `InvalidInput`.
pub fn percent_change_from(base: f64, values: &[f64]) -> CastResult<Vec<f64>> {
    if base == 0.0 {
        return Err(CastError::invalid_input("기준 종가가 0입니다"));
    }

    Ok(values.iter().map(|v| (v - base) / base * 100.0).collect())
}
