//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 설정 파일(TOML, 선택)과 `CAST__` 접두사 환경 변수에서 로드합니다.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::DistanceMethod;
use crate::error::{CastError, CastResult};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 엔진 기본값 및 요청 한도
    #[serde(default)]
    pub engine: EngineDefaults,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 응답 헤더까지의 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 허용 CORS origin 목록 (비어 있으면 모두 허용)
    pub cors_origins: Vec<String>,
    /// 요청 본문 최대 크기 (바이트)
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            request_timeout_secs: 30,
            cors_origins: Vec::new(),
            body_limit_bytes: 32 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `host:port` 주소 문자열.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
    /// span 진입/종료 이벤트 출력
    pub span_events: bool,
    /// 스레드 ID 출력 (rayon 워커 구분용)
    pub thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            span_events: false,
            thread_ids: false,
        }
    }
}

/// 엔진 기본값 및 요청 한도.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineDefaults {
    /// 기본 패턴 길이
    pub pattern_length: usize,
    /// 기본 예측 구간
    pub forecast_horizon: usize,
    /// 기본 상위 매칭 수
    pub top_k: usize,
    /// 기본 거리 계산 방식
    pub method: DistanceMethod,
    /// 기본 백테스트 간격 (num_tests, test_all 미지정 시)
    pub step_size: usize,
    /// 백테스트 병렬 평가 여부
    pub parallel: bool,
    /// 요청당 최대 캔들 수
    pub max_candles: usize,
    /// 최대 패턴 길이
    pub max_pattern_length: usize,
    /// 최대 예측 구간
    pub max_forecast_horizon: usize,
    /// 최대 상위 매칭 수
    pub max_top_k: usize,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            pattern_length: 20,
            forecast_horizon: 30,
            top_k: 5,
            method: DistanceMethod::Euclidean,
            step_size: 10,
            parallel: true,
            max_candles: 50_000,
            max_pattern_length: 500,
            max_forecast_horizon: 500,
            max_top_k: 100,
        }
    }
}

impl EngineDefaults {
    /// 요청 파라미터를 설정 한도와 비교합니다.
    ///
    /// 지정되지 않은 값은 검사하지 않습니다. 첫 번째 위반 필드를 보고합니다.
    pub fn check_limits(
        &self,
        candles: usize,
        pattern_length: Option<usize>,
        forecast_horizon: Option<usize>,
        top_k: Option<usize>,
    ) -> CastResult<()> {
        let checks = [
            ("data", Some(candles), self.max_candles),
            ("pattern_length", pattern_length, self.max_pattern_length),
            ("forecast_horizon", forecast_horizon, self.max_forecast_horizon),
            ("top_k", top_k, self.max_top_k),
        ];

        for (field, value, max) in checks {
            if let Some(value) = value.filter(|&v| v > max) {
                return Err(CastError::LimitExceeded { field, value, max });
            }
        }
        Ok(())
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CastResult<Self> {
        let builder = config::Config::builder()
            // 파일에서 로드 (선택)
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("CAST")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}
