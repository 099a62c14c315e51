//! 徽章账本仓储
//!
//! badge_grants 表的数据访问。(group_id, badge_kind) 上的唯一约束配合
//! `ON CONFLICT DO NOTHING`，使授予操作成为原子的比较并设置

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::traits::BadgeLedger;
use crate::error::Result;
use crate::models::{BadgeGrant, BadgeKind, GrantOutcome};

/// 徽章账本仓储
pub struct BadgeLedgerRepository {
    pool: PgPool,
}

impl BadgeLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    /// 群组是否已获得某种徽章
    pub async fn has_grant(&self, group_id: i64, kind: BadgeKind) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM badge_grants
                WHERE group_id = $1 AND badge_kind = $2
            )
            "#,
        )
        .bind(group_id)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// 列出群组已获得的徽章
    pub async fn list_grants(&self, group_id: i64) -> Result<Vec<BadgeGrant>> {
        let grants = sqlx::query_as::<_, BadgeGrant>(
            r#"
            SELECT id, group_id, badge_kind, granted_at
            FROM badge_grants
            WHERE group_id = $1
            ORDER BY granted_at ASC, id ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }

    /// 统计群组徽章数（看板按徽章数排序时使用）
    pub async fn count_grants(&self, group_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM badge_grants WHERE group_id = $1")
                .bind(group_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    // ==================== 写入操作 ====================

    /// 授予徽章
    ///
    /// 冲突时不插入，通过影响行数判断本次调用是否赢得竞争
    #[instrument(skip(self))]
    pub async fn grant(&self, group_id: i64, kind: BadgeKind) -> Result<GrantOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO badge_grants (group_id, badge_kind, granted_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (group_id, badge_kind) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(kind)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            Ok(GrantOutcome::Granted)
        } else {
            Ok(GrantOutcome::AlreadyExists)
        }
    }
}

#[async_trait]
impl BadgeLedger for BadgeLedgerRepository {
    async fn has_grant(&self, group_id: i64, kind: BadgeKind) -> Result<bool> {
        self.has_grant(group_id, kind).await
    }

    async fn grant(&self, group_id: i64, kind: BadgeKind) -> Result<GrantOutcome> {
        self.grant(group_id, kind).await
    }

    async fn list_grants(&self, group_id: i64) -> Result<Vec<BadgeGrant>> {
        self.list_grants(group_id).await
    }

    async fn count_grants(&self, group_id: i64) -> Result<i64> {
        self.count_grants(group_id).await
    }
}
