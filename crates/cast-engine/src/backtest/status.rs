//! 백테스트 실행 상태.
//!
//! `Idle → Running → {Completed | Failed | Cancelled}` 상태 머신입니다.
//! [`RunStatus`]는 복제 가능한 핸들로, 실행 중에도 다른 스레드에서 읽을 수 있습니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// 실행 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RunState {
    /// 시작 전
    Idle = 0,
    /// 실행 중
    Running = 1,
    /// 정상 완료 (요약 생성)
    Completed = 2,
    /// 계산 에러로 실패
    Failed = 3,
    /// 호출자 취소
    Cancelled = 4,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunState::Running,
            2 => RunState::Completed,
            3 => RunState::Failed,
            4 => RunState::Cancelled,
            _ => RunState::Idle,
        }
    }

    /// 종료 상태 여부.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::Cancelled
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// 공유 가능한 실행 상태 핸들.
#[derive(Debug, Clone, Default)]
pub struct RunStatus {
    state: Arc<AtomicU8>,
}

impl RunStatus {
    /// `Idle` 상태의 새 핸들.
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 상태.
    pub fn get(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `Idle → Running` 전이. 이미 시작된 경우 false.
    pub(crate) fn start(&self) -> bool {
        self.state
            .compare_exchange(
                RunState::Idle as u8,
                RunState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// `Running → 종료 상태` 전이.
    pub(crate) fn finish(&self, state: RunState) {
        debug_assert!(state.is_terminal());
        self.state.store(state as u8, Ordering::Release);
    }
}
