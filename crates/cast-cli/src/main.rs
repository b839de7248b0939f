//! 패턴 예측 엔진 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 인덱스 250 기준 패턴 예측 (JSON 출력)
//! cast match -i data/spy_daily.json --index 250
//!
//! # 간격 5로 백테스트
//! cast backtest -i data/spy_daily.json --step 5
//!
//! # 모든 지점 DTW 백테스트, 결과 저장
//! cast backtest -i data/spy_daily.json --test-all --method dtw -o reports/spy.json
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::error;

use cast_cli::commands::backtest::{run_backtest, BacktestCliConfig};
use cast_cli::commands::pattern::{run_match, MatchCliConfig};
use cast_core::logging::{init_logging, LogConfig, LogFormat};
use cast_core::{AppConfig, DistanceMethod};

#[derive(Parser)]
#[command(name = "cast")]
#[command(about = "Pattern matching forecast CLI - 유사 구간 기반 예측 및 백테스트", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 (엔진 기본값)
    #[arg(long, global = true, default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 선택 지점의 패턴 예측
    Match {
        /// 캔들 JSON 파일
        #[arg(short, long)]
        input: PathBuf,

        /// 선택 지점 인덱스 (패턴은 이 지점 직전 구간)
        #[arg(long)]
        index: usize,

        /// 패턴 길이
        #[arg(short = 'l', long)]
        pattern_length: Option<usize>,

        /// 예측 구간
        #[arg(short = 'H', long)]
        forecast_horizon: Option<usize>,

        /// 상위 매칭 수
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// 거리 계산 방식 (euclidean, dtw)
        #[arg(short, long)]
        method: Option<DistanceMethod>,

        /// 선택 지점 이후 구간까지 탐색
        #[arg(long)]
        unrestricted: bool,

        /// 서로 겹치지 않는 매칭 우선
        #[arg(long)]
        distinct: bool,

        /// 결과 저장 경로
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 워크포워드 백테스트 실행
    Backtest {
        /// 캔들 JSON 파일
        #[arg(short, long)]
        input: PathBuf,

        /// 패턴 길이
        #[arg(short = 'l', long)]
        pattern_length: Option<usize>,

        /// 예측 구간
        #[arg(short = 'H', long)]
        forecast_horizon: Option<usize>,

        /// 상위 매칭 수
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// 거리 계산 방식 (euclidean, dtw)
        #[arg(short, long)]
        method: Option<DistanceMethod>,

        /// 모든 지점 평가
        #[arg(long, conflicts_with_all = ["num_tests", "step"])]
        test_all: bool,

        /// 무작위 추출 지점 수
        #[arg(long, conflicts_with = "step")]
        num_tests: Option<usize>,

        /// 추출 시드
        #[arg(long, requires = "num_tests")]
        seed: Option<u64>,

        /// 간격 방식의 간격
        #[arg(long)]
        step: Option<usize>,

        /// 순차 평가 (병렬 비활성화)
        #[arg(long)]
        sequential: bool,

        /// 결과 저장 경로 (.json이면 JSON, 그 외 텍스트)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    // 표준 출력은 결과 JSON 용도. 기본 레벨은 warn, RUST_LOG로 조정
    init_logging(LogConfig::new("warn").with_format(LogFormat::Compact))
        .map_err(|e| anyhow!("로깅 초기화 실패: {}", e))?;

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("설정 로드 실패: {}", cli.config))?;
    let defaults = &config.engine;

    match cli.command {
        Commands::Match {
            input,
            index,
            pattern_length,
            forecast_horizon,
            top_k,
            method,
            unrestricted,
            distinct,
            output,
        } => {
            let match_config = MatchCliConfig {
                input,
                selected_index: index,
                pattern_length,
                forecast_horizon,
                top_k,
                method,
                unrestricted,
                distinct,
                output,
            };

            if let Err(e) = run_match(&match_config, defaults) {
                error!("Pattern match failed: {:#}", e);
                return Err(e);
            }
        }

        Commands::Backtest {
            input,
            pattern_length,
            forecast_horizon,
            top_k,
            method,
            test_all,
            num_tests,
            seed,
            step,
            sequential,
            output,
        } => {
            let backtest_config = BacktestCliConfig {
                input,
                pattern_length,
                forecast_horizon,
                top_k,
                method,
                test_all,
                num_tests,
                seed,
                step,
                sequential,
                output,
            };

            if let Err(e) = run_backtest(&backtest_config, defaults).await {
                error!("Backtest failed: {:#}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_match_args() {
        let cli = Cli::try_parse_from([
            "cast", "match", "-i", "c.json", "--index", "120", "-l", "10", "-H", "5",
            "--method", "dtw", "--distinct",
        ])
        .unwrap();

        match cli.command {
            Commands::Match {
                index,
                pattern_length,
                forecast_horizon,
                method,
                distinct,
                unrestricted,
                ..
            } => {
                assert_eq!(index, 120);
                assert_eq!(pattern_length, Some(10));
                assert_eq!(forecast_horizon, Some(5));
                assert_eq!(method, Some(DistanceMethod::Dtw));
                assert!(distinct);
                assert!(!unrestricted);
            }
            Commands::Backtest { .. } => panic!("expected match command"),
        }
    }

    #[test]
    fn test_backtest_selection_conflicts() {
        assert!(Cli::try_parse_from(["cast", "backtest", "-i", "c.json", "--test-all"]).is_ok());
        assert!(Cli::try_parse_from([
            "cast", "backtest", "-i", "c.json", "--test-all", "--num-tests", "5"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["cast", "backtest", "-i", "c.json", "--seed", "3"]).is_err());
        assert!(Cli::try_parse_from(["cast", "backtest", "-i", "c.json", "--method", "cosine"])
            .is_err());
    }
}
