//! 徽章评估服务
//!
//! 对单个群组读取最新快照，依次判定五种徽章，
//! 对条件成立且尚未持有的徽章调用账本授予。
//!
//! ## 幂等性
//!
//! 评估器不加锁。重复评估、并发评估以及扫描周期重叠时的正确性完全由
//! 账本 `grant` 的原子性保证：`has_grant` 只是减少无谓写入的快速路径，
//! 真正的判重发生在 `grant` 内部。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use board_shared::observability::metrics;

use super::dto::EvaluationReport;
use crate::error::Result;
use crate::models::{BadgeKind, GrantOutcome};
use crate::predicate;
use crate::repository::{ActivityReader, BadgeLedger};

/// 徽章评估器
pub struct BadgeEvaluator<R: ActivityReader, L: BadgeLedger> {
    reader: Arc<R>,
    ledger: Arc<L>,
}

impl<R: ActivityReader, L: BadgeLedger> BadgeEvaluator<R, L> {
    pub fn new(reader: Arc<R>, ledger: Arc<L>) -> Self {
        Self { reader, ledger }
    }

    /// 获取账本引用
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// 以当前时间评估群组
    pub async fn evaluate(&self, group_id: i64) -> Result<EvaluationReport> {
        self.evaluate_at(group_id, Utc::now()).await
    }

    /// 以指定时间评估群组
    ///
    /// 快照读取失败时返回错误，由调用方放弃本轮；
    /// 群组不存在不是错误，返回 `group_found = false` 的空结果
    #[instrument(skip(self, now))]
    pub async fn evaluate_at(&self, group_id: i64, now: DateTime<Utc>) -> Result<EvaluationReport> {
        let Some(activity) = self.reader.snapshot(group_id).await? else {
            debug!(group_id, "群组已不存在，跳过评估");
            return Ok(EvaluationReport::group_missing(group_id));
        };

        let mut report = EvaluationReport::new(group_id);

        for kind in predicate::satisfied_kinds(&activity, now) {
            report.satisfied.push(kind);

            match self.grant_if_absent(group_id, kind).await {
                Ok(GrantOutcome::Granted) => {
                    info!(
                        group_id,
                        badge_kind = %kind,
                        label = kind.label(),
                        "群组获得徽章"
                    );
                    metrics::record_badge_grant(kind.code(), GrantOutcome::Granted.as_str());
                    report.granted.push(kind);
                }
                Ok(GrantOutcome::AlreadyExists) => {
                    report.already_held.push(kind);
                }
                Err(e) => {
                    warn!(
                        group_id,
                        badge_kind = %kind,
                        error = %e,
                        "徽章授予失败，等待下次扫描重试"
                    );
                    metrics::record_badge_grant(kind.code(), "failed");
                    report.failed.push(kind);
                }
            }
        }

        debug!(
            group_id,
            satisfied = report.satisfied.len(),
            granted = report.granted.len(),
            failed = report.failed.len(),
            "群组评估完成"
        );

        Ok(report)
    }

    /// 未持有时授予
    async fn grant_if_absent(&self, group_id: i64, kind: BadgeKind) -> Result<GrantOutcome> {
        if self.ledger.has_grant(group_id, kind).await? {
            return Ok(GrantOutcome::AlreadyExists);
        }
        let outcome = self.ledger.grant(group_id, kind).await?;
        if !outcome.is_granted() {
            metrics::record_badge_grant(kind.code(), outcome.as_str());
        }
        Ok(outcome)
    }
}
