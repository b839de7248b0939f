//! 거리 계산 방식.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 패턴 간 거리 계산 방식.
///
/// 경계에서 알 수 없는 문자열은 역직렬화 단계에서 거부됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMethod {
    /// 유클리드 거리 (동일 길이)
    #[default]
    Euclidean,
    /// Dynamic Time Warping
    Dtw,
}

impl DistanceMethod {
    /// 직렬화 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMethod::Euclidean => "euclidean",
            DistanceMethod::Dtw => "dtw",
        }
    }
}

impl fmt::Display for DistanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DistanceMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "euclidean" => Ok(Self::Euclidean),
            "dtw" => Ok(Self::Dtw),
            _ => Err(format!("Unknown distance method: {}", s)),
        }
    }
}
