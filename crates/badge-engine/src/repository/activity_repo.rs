//! 群组活动仓储
//!
//! 从 CRUD 层维护的 groups / posts 表读取活动快照，只读不写

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use super::traits::{ActivityReader, GroupDirectory};
use crate::error::Result;
use crate::models::{GroupActivity, PostActivity};

/// groups 表中引擎关心的列
#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    created_at: DateTime<Utc>,
    like_count: i64,
}

/// 群组活动仓储
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 读取群组活动快照
    ///
    /// 群组行与帖子在同一个 REPEATABLE READ 只读事务中读取，
    /// 保证两次查询看到同一时间点的数据
    #[instrument(skip(self))]
    pub async fn snapshot(&self, group_id: i64) -> Result<Option<GroupActivity>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let group = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, created_at, like_count::BIGINT AS like_count
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(group_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(group) = group else {
            tx.rollback().await?;
            debug!(group_id, "群组不存在，跳过快照");
            return Ok(None);
        };

        let posts = sqlx::query_as::<_, PostActivity>(
            r#"
            SELECT created_at, like_count::BIGINT AS like_count
            FROM posts
            WHERE group_id = $1
            "#,
        )
        .bind(group_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(
            GroupActivity::new(group.id, group.created_at, group.like_count).with_posts(posts),
        ))
    }

    /// 列出全部群组 ID
    pub async fn list_all_group_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM groups")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}

#[async_trait]
impl ActivityReader for ActivityRepository {
    async fn snapshot(&self, group_id: i64) -> Result<Option<GroupActivity>> {
        self.snapshot(group_id).await
    }
}

#[async_trait]
impl GroupDirectory for ActivityRepository {
    async fn list_all_group_ids(&self) -> Result<Vec<i64>> {
        self.list_all_group_ids().await
    }
}
