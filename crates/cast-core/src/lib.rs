//! # Cast Core
//!
//! 패턴 매칭 예측 엔진의 핵심 도메인 모델 및 공통 인프라를 제공합니다.
//!
//! 이 크레이트는 엔진 전반에서 사용되는 기본 타입을 제공합니다:
//! - 캔들(OHLC) 및 시계열(Series) 데이터 모델
//! - 외부 입력 레코드 → 캔들 변환 (날짜 파싱)
//! - 에러 분류 체계
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
