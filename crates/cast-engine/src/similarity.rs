//! Pearson 기반 유사도 점수.
//!
//! 거리와 별개로 사람이 해석하기 쉬운 0~100 점수를 제공합니다.
//! 음의 상관은 0으로 처리합니다.

/// 두 정규화 시퀀스의 유사도 (0~100).
///
/// 앞에서부터 `min(len(a), len(b))`개 원소만 사용합니다.
/// 원소가 2개 미만이거나 어느 한쪽의 분산이 0이면 0을 반환합니다.
/// 결과는 항상 유한한 값입니다.
pub fn similarity(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }

    let (x, y) = (&a[..n], &b[..n]);
    if is_constant(x) || is_constant(y) {
        return 0.0;
    }

    let count = n as f64;
    let mean_x = x.iter().sum::<f64>() / count;
    let mean_y = y.iter().sum::<f64>() / count;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    if !r.is_finite() {
        return 0.0;
    }

    (r.max(0.0) * 100.0).clamp(0.0, 100.0)
}

// 모든 값이 같으면 분산 0 (평균의 반올림 오차와 무관)
fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|v| *v == values[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_shape_scores_100() {
        let a = [0.0, 1.0, 2.0, 3.0];
        let b = [0.0, 2.0, 4.0, 6.0];
        assert!((similarity(&a, &b) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_correlation_floors_at_zero() {
        let a = [0.0, 1.0, 2.0, 3.0];
        let b = [3.0, 2.0, 1.0, 0.0];
        assert_eq!(similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(similarity(&[1.0], &[1.0]), 0.0);
        assert_eq!(similarity(&[], &[1.0, 2.0]), 0.0);
        assert_eq!(similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_uses_common_prefix() {
        let a = [0.0, 1.0, 2.0];
        let b = [0.0, 1.0, 2.0, -50.0, 80.0];
        assert!((similarity(&a, &b) - 100.0).abs() < 1e-9);
    }
}
