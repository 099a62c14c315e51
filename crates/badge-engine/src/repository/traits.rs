//! 仓储 Trait 定义
//!
//! 评估器和扫描 Worker 只依赖这些抽象，便于替换存储实现和 mock 测试

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BadgeGrant, BadgeKind, GrantOutcome, GroupActivity};

/// 群组活动读取接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityReader: Send + Sync {
    /// 读取群组活动快照
    ///
    /// 单次调用内保证时间点一致；群组不存在（如扫描期间被删除）时返回 `None`
    async fn snapshot(&self, group_id: i64) -> Result<Option<GroupActivity>>;
}

/// 群组枚举接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// 列出全部群组 ID，不保证顺序
    async fn list_all_group_ids(&self) -> Result<Vec<i64>>;
}

/// 徽章账本接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BadgeLedger: Send + Sync {
    async fn has_grant(&self, group_id: i64, kind: BadgeKind) -> Result<bool>;

    /// 不存在时插入授予记录
    ///
    /// 必须原子：并发调用同一 (group_id, kind) 时至多一个返回 `Granted`
    async fn grant(&self, group_id: i64, kind: BadgeKind) -> Result<GrantOutcome>;

    /// 按授予时间升序列出群组已获得的徽章
    async fn list_grants(&self, group_id: i64) -> Result<Vec<BadgeGrant>>;

    async fn count_grants(&self, group_id: i64) -> Result<i64>;
}
