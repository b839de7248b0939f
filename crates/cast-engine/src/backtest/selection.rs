//! 테스트 지점 선택.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use cast_core::{CastError, CastResult};

/// 기본 간격.
pub const DEFAULT_STEP_SIZE: usize = 10;

/// 평가할 테스트 지점 선택 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TestSelection {
    /// 평가 가능한 모든 지점
    All,
    /// 비복원 무작위 추출 후 인덱스 오름차순 평가
    Sample {
        count: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
    /// 첫 지점부터 `step` 간격
    Stride { step: usize },
}

impl Default for TestSelection {
    fn default() -> Self {
        TestSelection::Stride {
            step: DEFAULT_STEP_SIZE,
        }
    }
}

impl TestSelection {
    /// 요청 파라미터로부터 선택 방식을 결정합니다.
    ///
    /// `test_all`이 우선하고, 그다음 `num_tests`, 둘 다 없으면 간격 방식입니다.
    pub fn from_request(
        test_all: bool,
        num_tests: Option<usize>,
        step_size: usize,
        seed: Option<u64>,
    ) -> Self {
        match (test_all, num_tests) {
            (true, _) => TestSelection::All,
            (false, Some(count)) => TestSelection::Sample { count, seed },
            (false, None) => TestSelection::Stride { step: step_size },
        }
    }

    /// 평가 가능 구간에서 테스트 지점을 고릅니다 (오름차순).
    ///
    /// # Errors
    ///
    /// `count` 또는 `step`이 0이면 `InvalidInput`.
    pub fn select(&self, eligible: Range<usize>) -> CastResult<Vec<usize>> {
        match *self {
            TestSelection::All => Ok(eligible.collect()),
            TestSelection::Stride { step } => {
                if step == 0 {
                    return Err(CastError::invalid_input("step_size는 1 이상이어야 합니다"));
                }
                Ok(eligible.step_by(step).collect())
            }
            TestSelection::Sample { count, seed } => {
                if count == 0 {
                    return Err(CastError::invalid_input("num_tests는 1 이상이어야 합니다"));
                }
                let available = eligible.len();
                let amount = count.min(available);
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };

                let mut points: Vec<usize> =
                    rand::seq::index::sample(&mut rng, available, amount)
                        .into_iter()
                        .map(|offset| eligible.start + offset)
                        .collect();
                points.sort_unstable();
                Ok(points)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_request_priority() {
        assert_eq!(
            TestSelection::from_request(true, Some(5), 10, None),
            TestSelection::All
        );
        assert_eq!(
            TestSelection::from_request(false, Some(5), 10, Some(7)),
            TestSelection::Sample {
                count: 5,
                seed: Some(7)
            }
        );
        assert_eq!(
            TestSelection::from_request(false, None, 4, None),
            TestSelection::Stride { step: 4 }
        );
    }

    #[test]
    fn test_stride_starts_at_first_eligible() {
        let points = TestSelection::Stride { step: 3 }.select(10..20).unwrap();
        assert_eq!(points, vec![10, 13, 16, 19]);
        assert!(TestSelection::Stride { step: 0 }.select(0..5).is_err());
    }

    #[test]
    fn test_sample_is_sorted_unique_and_bounded() {
        let selection = TestSelection::Sample {
            count: 8,
            seed: Some(42),
        };
        let points = selection.select(100..150).unwrap();
        assert_eq!(points.len(), 8);
        assert!(points.windows(2).all(|w| w[0] < w[1]));
        assert!(points.iter().all(|p| (100..150).contains(p)));

        // 같은 시드 → 같은 추출
        assert_eq!(selection.select(100..150).unwrap(), points);
    }

    #[test]
    fn test_sample_caps_at_available() {
        let points = TestSelection::Sample {
            count: 50,
            seed: None,
        }
        .select(5..9)
        .unwrap();
        assert_eq!(points, vec![5, 6, 7, 8]);
        assert!(TestSelection::Sample {
            count: 0,
            seed: None
        }
        .select(0..5)
        .is_err());
    }

    #[test]
    fn test_all_and_empty_range() {
        assert_eq!(TestSelection::All.select(3..6).unwrap(), vec![3, 4, 5]);
        assert!(TestSelection::default().select(5..5).unwrap().is_empty());
    }
}
