//! CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 캔들 JSON 파일 로드
//! - 단일 지점 패턴 예측
//! - 진행률 표시가 포함된 워크포워드 백테스트

pub mod commands;
