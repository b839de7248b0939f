//! 정규화된 시퀀스 간 거리 계산.
//!
//! 두 가지 전략을 제공합니다:
//! - **Euclidean**: 같은 길이 시퀀스의 L2 거리
//! - **DTW**: 시간축 왜곡을 허용하는 Dynamic Time Warping (제곱 비용, 윈도우 없음)
//!
//! 전략은 닫힌 열거형 [`DistanceMethod`]로 선택하며, 두 전략 모두
//! [`DistanceMetric`] 트레잇을 구현합니다.

use cast_core::{CastError, CastResult, DistanceMethod};

/// 두 시퀀스 간 비유사도(≥ 0)를 계산하는 전략.
pub trait DistanceMetric: Send + Sync {
    /// 전략 이름.
    fn name(&self) -> &'static str;

    /// 두 정규화 시퀀스의 거리.
    fn distance(&self, a: &[f64], b: &[f64]) -> CastResult<f64>;
}

/// 유클리드 거리.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

/// Dynamic Time Warping 거리.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dtw;

fn ensure_non_empty(a: &[f64], b: &[f64]) -> CastResult<()> {
    if a.is_empty() || b.is_empty() {
        return Err(CastError::invalid_input(format!(
            "거리 계산 입력이 비어 있습니다 (left={}, right={})",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

impl DistanceMetric for Euclidean {
    fn name(&self) -> &'static str {
        "euclidean"
    }

    fn distance(&self, a: &[f64], b: &[f64]) -> CastResult<f64> {
        ensure_non_empty(a, b)?;
        if a.len() != b.len() {
            return Err(CastError::LengthMismatch {
                left: a.len(),
                right: b.len(),
            });
        }

        let sum: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
        Ok(sum.sqrt())
    }
}

impl DistanceMetric for Dtw {
    fn name(&self) -> &'static str {
        "dtw"
    }

    /// 누적 비용 `D[n-1][m-1]`을 반환합니다 (제곱근 없음).
    ///
    /// 마지막 셀만 필요하므로 두 행만 유지합니다.
    fn distance(&self, a: &[f64], b: &[f64]) -> CastResult<f64> {
        ensure_non_empty(a, b)?;

        let m = b.len();
        let mut prev = vec![0.0_f64; m];
        let mut curr = vec![0.0_f64; m];

        // 첫 행: 가장자리를 따라 누적
        let mut acc = 0.0;
        for (j, bj) in b.iter().enumerate() {
            acc += (a[0] - bj) * (a[0] - bj);
            prev[j] = acc;
        }

        for ai in &a[1..] {
            curr[0] = prev[0] + (ai - b[0]) * (ai - b[0]);
            for j in 1..m {
                let cost = (ai - b[j]) * (ai - b[j]);
                curr[j] = cost + prev[j].min(curr[j - 1]).min(prev[j - 1]);
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        Ok(prev[m - 1])
    }
}

/// 방식에 해당하는 전략을 반환합니다.
pub fn metric_for(method: DistanceMethod) -> &'static dyn DistanceMetric {
    match method {
        DistanceMethod::Euclidean => &Euclidean,
        DistanceMethod::Dtw => &Dtw,
    }
}

/// 선택한 방식으로 거리를 계산합니다.
pub fn distance(method: DistanceMethod, a: &[f64], b: &[f64]) -> CastResult<f64> {
    metric_for(method).distance(a, b)
}
