//! 徽章引擎错误类型
//!
//! 区分可在下一个扫描周期自动恢复的瞬时故障与需要人工介入的系统错误

use std::time::Duration;

use thiserror::Error;

/// 徽章引擎错误类型
#[derive(Debug, Error)]
pub enum BadgeError {
    #[error("群组不存在: {0}")]
    GroupNotFound(i64),

    #[error("群组评估超时: group_id={group_id}, timeout_ms={timeout_ms}")]
    EvaluationTimeout { group_id: i64, timeout_ms: u64 },

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
}

/// 徽章引擎 Result 类型别名
pub type Result<T> = std::result::Result<T, BadgeError>;

impl BadgeError {
    /// 构造评估超时错误，保留亚秒级的超时配置
    pub fn evaluation_timeout(group_id: i64, timeout: Duration) -> Self {
        Self::EvaluationTimeout {
            group_id,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// 是否为瞬时错误
    ///
    /// 引擎本身不做重试循环，下一次扫描即是重试
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(_) | Self::EvaluationTimeout { .. } => true,
            Self::GroupNotFound(_) => false,
        }
    }

    /// 获取错误码（用于日志与指标标签）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::EvaluationTimeout { .. } => "EVALUATION_TIMEOUT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}
