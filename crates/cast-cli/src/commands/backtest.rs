//! 백테스트 명령어.
//!
//! 캔들 JSON 파일로 워크포워드 백테스트를 실행합니다.
//! 진행률 막대를 표시하고, Ctrl-C를 누르면 다음 테스트 지점 전에 멈춥니다.
//!
//! # 사용 예시
//!
//! ```bash
//! # 기본 간격(10) 방식
//! cast backtest -i data/spy_daily.json
//!
//! # 모든 지점, DTW
//! cast backtest -i data/spy_daily.json --test-all --method dtw
//!
//! # 무작위 50개 지점 (재현 가능)
//! cast backtest -i data/spy_daily.json --num-tests 50 --seed 7 -o reports/spy.json
//! ```

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use cast_core::{CastResult, DistanceMethod, EngineDefaults, Series};
use cast_engine::{BacktestConfig, BacktestEvent, BacktestRunner, BacktestSummary, TestSelection};

use super::input::{load_series, save_output};

/// 백테스트 CLI 설정
#[derive(Debug, Clone, Default)]
pub struct BacktestCliConfig {
    /// 캔들 JSON 파일 경로
    pub input: PathBuf,
    /// 패턴 길이 (미지정 시 설정 기본값)
    pub pattern_length: Option<usize>,
    /// 예측 구간
    pub forecast_horizon: Option<usize>,
    /// 상위 매칭 수
    pub top_k: Option<usize>,
    /// 거리 계산 방식
    pub method: Option<DistanceMethod>,
    /// 모든 지점 평가
    pub test_all: bool,
    /// 무작위 추출 지점 수
    pub num_tests: Option<usize>,
    /// 추출 시드
    pub seed: Option<u64>,
    /// 간격 방식의 간격
    pub step: Option<usize>,
    /// 순차 평가 (병렬 비활성화)
    pub sequential: bool,
    /// 결과 저장 경로 (옵션, `.json`이면 JSON, 그 외 텍스트 요약)
    pub output: Option<PathBuf>,
}

impl BacktestCliConfig {
    /// 지정된 파라미터를 설정 한도와 비교합니다.
    pub fn check_limits(&self, candles: usize, limits: &EngineDefaults) -> CastResult<()> {
        limits.check_limits(candles, self.pattern_length, self.forecast_horizon, self.top_k)
    }

    /// 설정 기본값을 채워 엔진 설정을 만듭니다.
    pub fn to_backtest_config(&self, defaults: &EngineDefaults) -> BacktestConfig {
        let selection = TestSelection::from_request(
            self.test_all,
            self.num_tests,
            self.step.unwrap_or(defaults.step_size),
            self.seed,
        );

        BacktestConfig::new(
            self.pattern_length.unwrap_or(defaults.pattern_length),
            self.forecast_horizon.unwrap_or(defaults.forecast_horizon),
        )
        .with_top_k(self.top_k.unwrap_or(defaults.top_k))
        .with_method(self.method.unwrap_or(defaults.method))
        .with_selection(selection)
        .with_parallel(defaults.parallel && !self.sequential)
    }
}

/// 진행률 막대 생성.
fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// 로드된 시계열로 백테스트를 실행합니다.
///
/// `cancel`이 취소되면 실행이 멈추고 에러를 반환합니다.
pub async fn backtest_series(
    series: Series,
    config: BacktestConfig,
    cancel: CancellationToken,
    pb: ProgressBar,
) -> Result<BacktestSummary> {
    config.validate()?;

    let runner = BacktestRunner::new(config).with_cancellation(cancel);
    let status = runner.status();
    let run_id = runner.run_id();

    let bar = pb.clone();
    let result = tokio::task::spawn_blocking(move || {
        let sink = move |event: BacktestEvent| {
            if let BacktestEvent::Progress { current, total, .. } = event {
                bar.set_length(total as u64);
                bar.set_position(current as u64);
            }
            true
        };
        runner.run(&series, &sink)
    })
    .await?;

    info!(%run_id, state = %status.get(), "Backtest finished");

    match result {
        Ok(summary) => {
            pb.finish_with_message("Backtest completed");
            Ok(summary)
        }
        Err(e) if e.is_cancelled() => {
            pb.abandon_with_message("Backtest cancelled");
            bail!("백테스트가 취소되었습니다")
        }
        Err(e) => {
            pb.abandon_with_message("Backtest failed");
            Err(e.into())
        }
    }
}

/// 백테스트 실행.
///
/// Ctrl-C 시그널을 받으면 실행을 취소합니다.
pub async fn run_backtest(
    config: &BacktestCliConfig,
    defaults: &EngineDefaults,
) -> Result<BacktestSummary> {
    let series = load_series(&config.input)?;
    config.check_limits(series.len(), defaults)?;
    let engine_config = config.to_backtest_config(defaults);

    info!(
        input = %config.input.display(),
        pattern_length = engine_config.pattern_length,
        forecast_horizon = engine_config.forecast_horizon,
        method = %engine_config.method,
        "Running backtest"
    );

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, cancelling backtest...");
            ctrl_c_token.cancel();
        }
    });

    let result = backtest_series(series, engine_config, cancel, progress_bar()?).await;
    ctrl_c.abort();
    let summary = result?;

    println!("{}", format_summary(&summary));
    if let Some(path) = &config.output {
        save_report(&summary, path)?;
        println!("결과 저장 위치: {}", path.display());
    }

    Ok(summary)
}

/// 요약을 사람이 읽기 쉬운 텍스트로 변환합니다.
pub fn format_summary(summary: &BacktestSummary) -> String {
    let mut out = String::new();
    let hits = summary.cases.iter().filter(|c| c.direction_correct).count();

    let _ = writeln!(out, "\n📊 백테스트 결과");
    let _ = writeln!(
        out,
        "═══════════════════════════════════════════════════════════════"
    );
    let _ = writeln!(
        out,
        "  방식: {}  패턴 길이: {}  예측 구간: {}",
        summary.method, summary.pattern_length, summary.forecast_horizon
    );
    let _ = writeln!(out, "  테스트 지점: {}", summary.total_tests);
    let _ = writeln!(
        out,
        "  방향 적중률: {:.2}% ({}/{})",
        summary.direction_accuracy, hits, summary.total_tests
    );
    let _ = writeln!(out, "  평균 범위 적중률: {:.2}%", summary.avg_range_accuracy);
    let _ = write!(
        out,
        "═══════════════════════════════════════════════════════════════"
    );
    out
}

/// 백테스트 리포트를 파일로 저장
fn save_report(summary: &BacktestSummary, path: &Path) -> Result<()> {
    let content = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::to_string_pretty(summary)?
    } else {
        // 기본: 텍스트 요약
        format_summary(summary)
    };

    save_output(path, &content)
}

// ==================== 테스트 ====================
