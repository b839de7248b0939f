//! 백테스트 러너.
//!
//! 테스트 지점 `i`마다 경계를 `i`로 둔 패턴 탐색을 수행하므로, 후보 구간과
//! 그 예측 구간 `[s, s+L+H)`는 항상 `i` 이전에 있습니다. 실제 경로는
//! `close[i]` 기준 변화율 `close[i+1..=i+H]`입니다.

use rayon::prelude::*;
use std::ops::Range;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use cast_core::{CastError, CastResult, Series};

use super::events::{BacktestEvent, EventSink};
use super::status::{RunState, RunStatus};
use super::{round2, BacktestCase, BacktestConfig, BacktestSummary};
use crate::cloud::{build_cloud, CloudPoint};
use crate::matcher::{find_matches, MatchQuery};
use crate::normalize::percent_change_from;

/// 평가 가능한 테스트 지점 구간.
///
/// `i + H < len`이면서 경계 이전에 후보가 최소 하나 존재하는
/// `i ≥ L + max(L, H)` 지점입니다. 평가 가능한 지점이 없으면 `None`.
pub fn eligible_range(
    series_len: usize,
    pattern_length: usize,
    forecast_horizon: usize,
) -> Option<Range<usize>> {
    // i - L ≥ 0만으로는 부족함. 경계 i 이전에 [s, s+L+H) 후보가 없으면 구름이
    // 비어 방향과 범위를 채점할 수 없으므로, 첫 후보(s = 0)가 참조 구간
    // [i-L, i)와 겹치지 않고 경계 안에 드는 지점부터 평가함
    let first = pattern_length.saturating_add(pattern_length.max(forecast_horizon));
    let end = series_len.checked_sub(forecast_horizon)?;
    (first < end).then_some(first..end)
}

/// 워크포워드 백테스트 러너.
///
/// 러너 하나는 한 번만 실행할 수 있습니다. 상태는 [`RunStatus`] 핸들로 관찰합니다.
#[derive(Debug)]
pub struct BacktestRunner {
    config: BacktestConfig,
    run_id: Uuid,
    cancel: CancellationToken,
    status: RunStatus,
}

impl BacktestRunner {
    /// 새 러너를 생성합니다.
    pub fn new(config: BacktestConfig) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            status: RunStatus::new(),
        }
    }

    /// 외부 취소 토큰을 사용합니다.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// 실행 ID.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// 설정.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// 취소 토큰 (복제본).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 실행 상태 핸들 (복제본).
    pub fn status(&self) -> RunStatus {
        self.status.clone()
    }

    /// 백테스트를 실행합니다.
    ///
    /// 진행률 이벤트는 테스트 지점이 끝날 때마다 완료 순서대로 전달되고,
    /// 성공 시 결과 이벤트, 실패 시 에러 이벤트가 마지막에 전달됩니다.
    /// 취소된 실행은 종료 이벤트 없이 `Cancelled`를 반환합니다.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: 잘못된 설정 또는 이미 실행한 러너
    /// - `NoEligibleTestPoints`: 평가 가능한 지점 없음
    /// - `Cancelled`: 취소 토큰이 취소되었거나 수신자가 사라짐
    pub fn run(&self, series: &Series, sink: &dyn EventSink) -> CastResult<BacktestSummary> {
        let span = info_span!(
            "backtest",
            run_id = %self.run_id,
            method = %self.config.method,
            pattern_length = self.config.pattern_length,
            forecast_horizon = self.config.forecast_horizon,
        );
        let _guard = span.enter();

        if !self.status.start() {
            return Err(CastError::invalid_input(format!(
                "이미 실행된 러너입니다 (state={})",
                self.status.get()
            )));
        }

        let started = Instant::now();
        let outcome = self.execute(series, sink);

        match &outcome {
            Ok(summary) => {
                self.status.finish(RunState::Completed);
                info!(
                    total_tests = summary.total_tests,
                    direction_accuracy = summary.direction_accuracy,
                    avg_range_accuracy = summary.avg_range_accuracy,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "백테스트 완료"
                );
                sink.send(BacktestEvent::Result(summary.clone()));
            }
            Err(CastError::Cancelled) => {
                self.status.finish(RunState::Cancelled);
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "백테스트 취소됨"
                );
            }
            Err(err) => {
                self.status.finish(RunState::Failed);
                warn!(error = %err, "백테스트 실패");
                sink.send(BacktestEvent::Error {
                    message: err.to_string(),
                });
            }
        }

        outcome
    }

    fn execute(&self, series: &Series, sink: &dyn EventSink) -> CastResult<BacktestSummary> {
        let config = &self.config;
        config.validate()?;

        let no_points = || CastError::NoEligibleTestPoints {
            series_len: series.len(),
            pattern_length: config.pattern_length,
            forecast_horizon: config.forecast_horizon,
        };

        let eligible = eligible_range(series.len(), config.pattern_length, config.forecast_horizon)
            .ok_or_else(no_points)?;
        let points = config.selection.select(eligible)?;
        if points.is_empty() {
            return Err(no_points());
        }

        let total = points.len();
        info!(total, parallel = config.parallel, "백테스트 시작");

        let evaluate = |index: usize| -> CastResult<BacktestCase> {
            if self.cancel.is_cancelled() {
                return Err(CastError::Cancelled);
            }
            evaluate_point(series, config, index)
        };

        let cases: Vec<BacktestCase> = if config.parallel {
            self.evaluate_parallel(&points, &evaluate, sink)?
        } else {
            let mut reporter = ProgressReporter::new(total);
            points
                .iter()
                .map(|&index| {
                    let case = evaluate(index)?;
                    reporter.completed(self, sink);
                    Ok(case)
                })
                .collect::<CastResult<_>>()?
        };

        Ok(summarize(config, cases))
    }

    /// rayon 풀에서 지점을 평가하고, 호출 스레드에서 진행률을 전달합니다.
    ///
    /// 워커는 완료 신호만 채널로 보내므로 수신자가 느려도 rayon 워커가
    /// 묶이지 않습니다.
    fn evaluate_parallel<F>(
        &self,
        points: &[usize],
        evaluate: &F,
        sink: &dyn EventSink,
    ) -> CastResult<Vec<BacktestCase>>
    where
        F: Fn(usize) -> CastResult<BacktestCase> + Sync,
    {
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let mut reporter = ProgressReporter::new(points.len());

        thread::scope(|scope| {
            let workers = scope.spawn(move || {
                points
                    .par_iter()
                    .map(|&index| {
                        let case = evaluate(index)?;
                        // 수신 측이 먼저 끝나는 경우는 없음
                        let _ = done_tx.send(());
                        Ok(case)
                    })
                    .collect::<CastResult<Vec<_>>>()
            });

            // 모든 워커가 끝나 송신자가 해제되면 루프 종료
            for () in done_rx.iter() {
                reporter.completed(self, sink);
            }

            workers
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        })
    }
}

/// 완료 순서대로 진행률을 전달합니다.
///
/// 수신자가 닫히면 실행을 취소하고 이후 진행률은 보내지 않습니다.
struct ProgressReporter {
    current: usize,
    total: usize,
    open: bool,
}

impl ProgressReporter {
    fn new(total: usize) -> Self {
        Self {
            current: 0,
            total,
            open: true,
        }
    }

    fn completed(&mut self, runner: &BacktestRunner, sink: &dyn EventSink) {
        self.current += 1;
        if self.open && !sink.send(BacktestEvent::progress(self.current, self.total)) {
            debug!("이벤트 수신자 종료, 실행 취소");
            self.open = false;
            runner.cancel.cancel();
        }
    }
}

/// 테스트 지점 하나를 평가합니다.
pub(crate) fn evaluate_point(
    series: &Series,
    config: &BacktestConfig,
    index: usize,
) -> CastResult<BacktestCase> {
    let horizon = config.forecast_horizon;
    let query = MatchQuery::new(index, config.pattern_length, horizon, config.top_k)
        .with_method(config.method);
    let result = find_matches(series, &query)?;
    let cloud = build_cloud(series, &result.matches, horizon)?;

    let base = series.closes()[index];
    let future = series.close_window(index + 1, index.saturating_add(horizon).saturating_add(1))?;
    let actual = percent_change_from(base, future)?;
    let (direction_correct, range_accuracy) = score_forecast(&cloud, &actual);

    debug!(
        test_index = index,
        matches = result.matches.len(),
        direction_correct,
        range_accuracy,
        "테스트 지점 평가"
    );

    Ok(BacktestCase {
        test_index: index,
        date: series.candles()[index].timestamp,
        matches_found: result.matches.len(),
        range_accuracy,
        direction_correct,
    })
}

/// 예측 구름과 실제 경로를 비교합니다.
///
/// 방향은 구름 마지막 스텝의 중앙값과 같은 스텝의 실제 변화율 부호를 비교하며
/// 0보다 클 때만 상승으로 봅니다. 범위 적중률은 `[min, max]` 안에 든 스텝 비율입니다.
pub(crate) fn score_forecast(cloud: &[CloudPoint], actual: &[f64]) -> (bool, f64) {
    let steps = cloud.len().min(actual.len());
    if steps == 0 {
        return (false, 0.0);
    }

    let last = &cloud[steps - 1];
    let predicted_up = last.median > 0.0;
    let actual_up = actual[steps - 1] > 0.0;

    let hits = cloud[..steps]
        .iter()
        .zip(actual)
        .filter(|(point, value)| point.min <= **value && **value <= point.max)
        .count();

    (
        predicted_up == actual_up,
        round2(hits as f64 * 100.0 / steps as f64),
    )
}

fn summarize(config: &BacktestConfig, cases: Vec<BacktestCase>) -> BacktestSummary {
    let total = cases.len();
    let correct = cases.iter().filter(|c| c.direction_correct).count();
    let range_sum: f64 = cases.iter().map(|c| c.range_accuracy).sum();
    let (direction_accuracy, avg_range_accuracy) = if total == 0 {
        (0.0, 0.0)
    } else {
        (
            round2(correct as f64 * 100.0 / total as f64),
            round2(range_sum / total as f64),
        )
    };

    BacktestSummary {
        total_tests: total,
        direction_accuracy,
        avg_range_accuracy,
        method: config.method,
        pattern_length: config.pattern_length,
        forecast_horizon: config.forecast_horizon,
        cases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{NoopSink, TestSelection};
    use cast_core::Candle;
    use std::sync::Mutex;
    use chrono::{Duration, TimeZone, Utc};

    fn series_from(closes: &[f64]) -> Series {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Series::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| Candle::new(base + Duration::days(i as i64), c, c, c, c))
                .collect(),
        )
        .unwrap()
    }

    fn point(step: usize, min: f64, median: f64, max: f64) -> CloudPoint {
        CloudPoint {
            step,
            min,
            p25: min,
            median,
            p75: max,
            max,
            num_samples: 3,
        }
    }

    #[test]
    fn test_eligible_range() {
        // L=5, H=3: i ≥ 10, i + 3 < 20
        assert_eq!(eligible_range(20, 5, 3), Some(10..17));
        // H > L: i ≥ 5 + 8
        assert_eq!(eligible_range(30, 5, 8), Some(13..22));
        assert_eq!(eligible_range(12, 5, 3), None);
        assert_eq!(eligible_range(2, 5, 3), None);
        assert_eq!(eligible_range(100, usize::MAX, 3), None);
        assert_eq!(eligible_range(100, 5, usize::MAX), None);
    }

    #[test]
    fn test_score_forecast() {
        let cloud = [point(1, -1.0, 0.5, 2.0), point(2, -2.0, 1.0, 3.0)];
        assert_eq!(score_forecast(&cloud, &[0.0, 2.5]), (true, 100.0));
        assert_eq!(score_forecast(&cloud, &[5.0, -0.1]), (false, 50.0));
        // 0은 하락으로 판정
        assert_eq!(score_forecast(&cloud, &[0.0, 0.0]), (false, 100.0));
        assert_eq!(score_forecast(&[], &[1.0]), (false, 0.0));
    }

    #[test]
    fn test_no_eligible_points() {
        let series = series_from(&[100.0; 12]);
        let runner = BacktestRunner::new(BacktestConfig::new(5, 3));
        let err = runner.run(&series, &NoopSink).unwrap_err();
        assert!(matches!(err, CastError::NoEligibleTestPoints { .. }));
        assert_eq!(runner.status().get(), RunState::Failed);
    }

    #[test]
    fn test_runner_is_single_use() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let series = series_from(&closes);
        let runner = BacktestRunner::new(
            BacktestConfig::new(5, 3).with_selection(TestSelection::All),
        );
        assert!(runner.run(&series, &NoopSink).is_ok());
        assert_eq!(runner.status().get(), RunState::Completed);
        assert!(matches!(
            runner.run(&series, &NoopSink),
            Err(CastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_pre_cancelled_run_emits_no_summary() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let series = series_from(&closes);
        let runner = BacktestRunner::new(BacktestConfig::new(5, 3));
        runner.cancellation_token().cancel();

        let events = Mutex::new(Vec::new());
        let sink = |event: BacktestEvent| {
            events.lock().unwrap().push(event);
            true
        };
        let err = runner.run(&series, &sink).unwrap_err();

        assert_eq!(err, CastError::Cancelled);
        assert_eq!(runner.status().get(), RunState::Cancelled);
        assert!(events.lock().unwrap().is_empty());
    }
}
