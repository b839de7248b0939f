//! 백테스트 스트리밍 이벤트.
//!
//! 진행률 이벤트가 0개 이상 이어지고, 마지막에 결과 또는 에러 이벤트가
//! 정확히 하나 옵니다. 취소된 실행은 종료 이벤트를 보내지 않습니다.

use serde::{Deserialize, Serialize};

use super::BacktestSummary;

/// 백테스트 이벤트.
///
/// JSON 직렬화 시 `type` 필드로 구분됩니다 (`progress`, `result`, `error`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BacktestEvent {
    /// 테스트 지점 하나 완료
    Progress {
        /// 완료한 지점 수
        current: usize,
        /// 전체 지점 수
        total: usize,
        /// 진행률 (0~100, 반올림)
        progress: u8,
    },
    /// 최종 요약
    Result(BacktestSummary),
    /// 실행 실패
    Error {
        /// 에러 메시지
        message: String,
    },
}

impl BacktestEvent {
    /// 진행률 이벤트를 생성합니다.
    pub fn progress(current: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            (current as f64 * 100.0 / total as f64).round()
        };
        BacktestEvent::Progress {
            current,
            total,
            progress: percent.clamp(0.0, 100.0) as u8,
        }
    }

    /// 종료 이벤트 여부.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BacktestEvent::Progress { .. })
    }
}

/// 백테스트 이벤트 수신자.
///
/// 병렬 워커에서 호출되므로 `Sync`여야 합니다. 러너는 이벤트를 하나의 락 아래에서
/// 순서대로 전달합니다. `false`를 반환하면 소비자가 사라진 것으로 보고 실행을
/// 취소합니다.
pub trait EventSink: Send + Sync {
    /// 이벤트 전달. 소비자가 더 이상 없으면 false.
    fn send(&self, event: BacktestEvent) -> bool;
}

impl<F> EventSink for F
where
    F: Fn(BacktestEvent) -> bool + Send + Sync,
{
    fn send(&self, event: BacktestEvent) -> bool {
        self(event)
    }
}

/// 이벤트를 버리는 수신자.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn send(&self, _event: BacktestEvent) -> bool {
        true
    }
}
