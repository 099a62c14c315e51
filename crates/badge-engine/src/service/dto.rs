//! 评估结果 DTO

use serde::Serialize;

use crate::models::BadgeKind;

/// 单个群组一次评估的结果
///
/// 同一群组内某种徽章授予失败不影响其他种类，因此结果可能是部分成功
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub group_id: i64,
    /// 快照读取时群组是否存在
    pub group_found: bool,
    /// 条件成立的徽章
    pub satisfied: Vec<BadgeKind>,
    /// 本次新授予的徽章
    pub granted: Vec<BadgeKind>,
    /// 条件成立但已持有（含并发竞争失败）
    pub already_held: Vec<BadgeKind>,
    /// 授予过程出错的徽章，下一次扫描会重新尝试
    pub failed: Vec<BadgeKind>,
}

impl EvaluationReport {
    pub fn new(group_id: i64) -> Self {
        Self {
            group_id,
            group_found: true,
            ..Default::default()
        }
    }

    /// 群组不存在时的空结果
    pub fn group_missing(group_id: i64) -> Self {
        Self {
            group_id,
            group_found: false,
            ..Default::default()
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}
