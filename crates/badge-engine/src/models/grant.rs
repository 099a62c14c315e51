//! 徽章授予事实

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BadgeKind;

/// 徽章授予记录
///
/// 由评估器创建，之后不再修改或删除
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BadgeGrant {
    pub id: i64,
    pub group_id: i64,
    pub badge_kind: BadgeKind,
    pub granted_at: DateTime<Utc>,
}

/// 授予操作结果
///
/// 并发竞争同一 (group_id, badge_kind) 时只有一个调用方得到 Granted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    AlreadyExists,
}

impl GrantOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// 指标标签
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::AlreadyExists => "already_exists",
        }
    }
}
