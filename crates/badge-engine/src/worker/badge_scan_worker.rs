//! 徽章扫描 Worker
//!
//! 以固定间隔扫描全部群组并逐一评估徽章：
//! 1. 枚举全部群组 ID
//! 2. 有界并发地评估每个群组，单个群组设评估超时
//! 3. 汇总本轮结果并记录指标
//!
//! 单个群组失败只记录日志，不影响同轮其他群组；枚举失败则放弃本轮。
//! 每轮扫描在独立任务中执行，新一轮可以在上一轮结束前开始，同时进行的轮次数有上限。
//! 重叠扫描的正确性由账本的原子授予保证，不依赖轮次间互斥。

use std::sync::Arc;
use std::time::{Duration, Instant};

use board_shared::config::BadgeScanConfig;
use board_shared::observability::metrics;
use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::error::BadgeError;
use crate::repository::{ActivityReader, BadgeLedger, GroupDirectory};
use crate::service::BadgeEvaluator;

const WORKER_NAME: &str = "badge_scan_worker";

/// 一轮扫描的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// 枚举失败，本轮未评估任何群组
    pub abandoned: bool,
    pub groups_total: usize,
    pub evaluated: usize,
    /// 枚举后被删除的群组
    pub skipped: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub badges_granted: usize,
    /// 授予出错的徽章数（所属群组仍计入 evaluated）
    pub grant_failures: usize,
}

impl TickSummary {
    fn abandoned() -> Self {
        Self {
            abandoned: true,
            ..Default::default()
        }
    }

    fn status(&self) -> &'static str {
        if self.abandoned {
            "abandoned"
        } else if self.failed > 0 || self.timed_out > 0 || self.grant_failures > 0 {
            "partial"
        } else {
            "success"
        }
    }
}

/// 单个群组的评估结果
enum GroupOutcome {
    Evaluated { granted: usize, grant_failures: usize },
    Skipped,
    Failed,
    TimedOut,
}

impl GroupOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Evaluated { .. } => "evaluated",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// 徽章扫描 Worker
///
/// 由宿主进程持有和启动，依赖通过构造函数显式传入。
pub struct BadgeScanWorker<D, R, L>
where
    D: GroupDirectory,
    R: ActivityReader,
    L: BadgeLedger,
{
    directory: Arc<D>,
    evaluator: Arc<BadgeEvaluator<R, L>>,
    /// 扫描间隔（默认 10 秒）
    interval: Duration,
    /// 单个群组评估超时
    group_timeout: Duration,
    /// 同一轮内并发评估的群组数上限
    max_concurrency: usize,
    /// 同时进行中的扫描轮次上限
    max_in_flight_ticks: usize,
}

impl<D, R, L> BadgeScanWorker<D, R, L>
where
    D: GroupDirectory + 'static,
    R: ActivityReader + 'static,
    L: BadgeLedger + 'static,
{
    /// 根据扫描配置创建 Worker
    pub fn new(
        directory: Arc<D>,
        evaluator: Arc<BadgeEvaluator<R, L>>,
        config: &BadgeScanConfig,
    ) -> Self {
        Self {
            directory,
            evaluator,
            interval: config.interval(),
            group_timeout: config.group_timeout(),
            max_concurrency: config.max_concurrency.max(1),
            max_in_flight_ticks: config.max_in_flight_ticks.max(1),
        }
    }

    /// 覆盖扫描间隔（主要用于测试）
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// 覆盖同时进行中的扫描轮次上限（主要用于测试）
    pub fn with_max_in_flight_ticks(mut self, max: usize) -> Self {
        self.max_in_flight_ticks = max.max(1);
        self
    }

    /// 覆盖单群组超时（主要用于测试）
    pub fn with_group_timeout(mut self, timeout: Duration) -> Self {
        self.group_timeout = timeout;
        self
    }

    /// 主循环：按固定间隔触发扫描，直到收到关闭信号
    ///
    /// 关闭信号只阻止新一轮开始，已开始的扫描会运行到结束
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval = ?self.interval,
            group_timeout = ?self.group_timeout,
            max_concurrency = self.max_concurrency,
            max_in_flight_ticks = self.max_in_flight_ticks,
            "BadgeScanWorker 已启动"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if in_flight.len() >= self.max_in_flight_ticks {
                        warn!(
                            in_flight = in_flight.len(),
                            "进行中的扫描已达上限，跳过本次触发"
                        );
                        metrics::record_badge_scan("skipped", 0.0);
                        continue;
                    }
                    let worker = Arc::clone(&self);
                    in_flight.spawn(async move { worker.run_tick().await });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "扫描任务异常退出");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(in_flight = in_flight.len(), "BadgeScanWorker 停止触发，等待进行中的扫描完成");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "扫描任务异常退出");
            }
        }
        info!("BadgeScanWorker 已停止");
    }

    /// 执行一轮扫描
    pub async fn run_tick(&self) -> TickSummary {
        let started = Instant::now();

        let group_ids = match self.directory.list_all_group_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, code = e.error_code(), "枚举群组失败，放弃本轮扫描");
                let summary = TickSummary::abandoned();
                metrics::record_badge_scan(summary.status(), started.elapsed().as_secs_f64());
                return summary;
            }
        };

        let mut summary = TickSummary {
            groups_total: group_ids.len(),
            ..Default::default()
        };

        let outcomes: Vec<GroupOutcome> = stream::iter(group_ids)
            .map(|group_id| self.evaluate_group(group_id))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            metrics::record_group_evaluation(outcome.as_str());
            match outcome {
                GroupOutcome::Evaluated {
                    granted,
                    grant_failures,
                } => {
                    summary.evaluated += 1;
                    summary.badges_granted += granted;
                    summary.grant_failures += grant_failures;
                }
                GroupOutcome::Skipped => summary.skipped += 1,
                GroupOutcome::Failed => summary.failed += 1,
                GroupOutcome::TimedOut => summary.timed_out += 1,
            }
        }

        let elapsed = started.elapsed();
        metrics::record_badge_scan(summary.status(), elapsed.as_secs_f64());
        metrics::set_worker_last_run(WORKER_NAME);

        if summary.badges_granted > 0 || summary.status() != "success" {
            info!(
                groups = summary.groups_total,
                granted = summary.badges_granted,
                skipped = summary.skipped,
                failed = summary.failed,
                timed_out = summary.timed_out,
                elapsed_ms = elapsed.as_millis() as u64,
                "徽章扫描完成"
            );
        }

        summary
    }

    /// 评估单个群组，错误和超时在此吸收，不外溢到同轮其他群组
    async fn evaluate_group(&self, group_id: i64) -> GroupOutcome {
        match tokio::time::timeout(self.group_timeout, self.evaluator.evaluate(group_id)).await {
            Ok(Ok(report)) if !report.group_found => GroupOutcome::Skipped,
            Ok(Ok(report)) => GroupOutcome::Evaluated {
                granted: report.granted.len(),
                grant_failures: report.failed.len(),
            },
            Ok(Err(e)) => {
                warn!(
                    group_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "群组评估失败，下次扫描重试"
                );
                GroupOutcome::Failed
            }
            Err(_) => {
                let e = BadgeError::evaluation_timeout(group_id, self.group_timeout);
                warn!(group_id, error = %e, "群组评估超时，下次扫描重试");
                GroupOutcome::TimedOut
            }
        }
    }
}
