//! 内存存储
//!
//! 使用 DashMap 实现的高并发内存存储，同时实现活动读取、群组枚举和徽章账本三个接口，
//! 适用于测试和开发环境。

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::traits::{ActivityReader, BadgeLedger, GroupDirectory};
use crate::error::{BadgeError, Result};
use crate::models::{BadgeGrant, BadgeKind, GrantOutcome, GroupActivity, PostActivity};

/// 内存看板存储
///
/// 克隆后共享同一份数据。授予操作基于 DashMap 的 entry API，
/// 同一 (group_id, kind) 的并发插入只有一个成功。
#[derive(Debug, Clone, Default)]
pub struct InMemoryBoardStore {
    groups: Arc<DashMap<i64, GroupActivity>>,
    grants: Arc<DashMap<(i64, BadgeKind), BadgeGrant>>,
    next_grant_id: Arc<AtomicI64>,
}

impl InMemoryBoardStore {
    /// 创建新的内存存储实例
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== 群组与帖子 ====================

    /// 插入或覆盖群组快照
    pub fn upsert_group(&self, activity: GroupActivity) {
        self.groups.insert(activity.group_id, activity);
    }

    /// 删除群组（模拟扫描期间被 CRUD 层删除）
    pub fn remove_group(&self, group_id: i64) -> Option<GroupActivity> {
        self.groups.remove(&group_id).map(|(_, v)| v)
    }

    /// 为群组追加一篇帖子
    pub fn add_post(&self, group_id: i64, created_at: DateTime<Utc>, like_count: i64) -> Result<()> {
        let mut group = self
            .groups
            .get_mut(&group_id)
            .ok_or(BadgeError::GroupNotFound(group_id))?;
        group.posts.push(PostActivity::new(created_at, like_count));
        Ok(())
    }

    /// 设置群组点赞数
    pub fn set_group_likes(&self, group_id: i64, like_count: i64) -> Result<()> {
        let mut group = self
            .groups
            .get_mut(&group_id)
            .ok_or(BadgeError::GroupNotFound(group_id))?;
        group.like_count = like_count;
        Ok(())
    }

    /// 读取群组快照的克隆，调用方持有的副本不受后续写入影响
    pub fn get_group(&self, group_id: i64) -> Option<GroupActivity> {
        self.groups.get(&group_id).map(|g| g.clone())
    }

    // ==================== 徽章 ====================

    /// 全部授予记录数
    pub fn grant_count(&self) -> usize {
        self.grants.len()
    }

    /// 插入授予记录，已存在时保持原记录不变
    pub fn insert_grant(&self, group_id: i64, kind: BadgeKind) -> GrantOutcome {
        match self.grants.entry((group_id, kind)) {
            Entry::Occupied(_) => GrantOutcome::AlreadyExists,
            Entry::Vacant(entry) => {
                let id = self.next_grant_id.fetch_add(1, Ordering::SeqCst) + 1;
                entry.insert(BadgeGrant {
                    id,
                    group_id,
                    badge_kind: kind,
                    granted_at: Utc::now(),
                });
                GrantOutcome::Granted
            }
        }
    }
}

#[async_trait]
impl ActivityReader for InMemoryBoardStore {
    async fn snapshot(&self, group_id: i64) -> Result<Option<GroupActivity>> {
        Ok(self.get_group(group_id))
    }
}

#[async_trait]
impl GroupDirectory for InMemoryBoardStore {
    async fn list_all_group_ids(&self) -> Result<Vec<i64>> {
        Ok(self.groups.iter().map(|entry| *entry.key()).collect())
    }
}

#[async_trait]
impl BadgeLedger for InMemoryBoardStore {
    async fn has_grant(&self, group_id: i64, kind: BadgeKind) -> Result<bool> {
        Ok(self.grants.contains_key(&(group_id, kind)))
    }

    async fn grant(&self, group_id: i64, kind: BadgeKind) -> Result<GrantOutcome> {
        Ok(self.insert_grant(group_id, kind))
    }

    async fn list_grants(&self, group_id: i64) -> Result<Vec<BadgeGrant>> {
        let mut grants: Vec<_> = self
            .grants
            .iter()
            .filter(|entry| entry.key().0 == group_id)
            .map(|entry| entry.value().clone())
            .collect();
        grants.sort_by(|a, b| a.granted_at.cmp(&b.granted_at).then(a.id.cmp(&b.id)));
        Ok(grants)
    }

    async fn count_grants(&self, group_id: i64) -> Result<i64> {
        let count = self
            .grants
            .iter()
            .filter(|entry| entry.key().0 == group_id)
            .count();
        Ok(count as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_group(group_id: i64) -> InMemoryBoardStore {
        let store = InMemoryBoardStore::new();
        store.upsert_group(GroupActivity::new(group_id, Utc::now(), 0));
        store
    }

    #[tokio::test]
    async fn test_grant_is_insert_if_absent() {
        let store = store_with_group(1);

        assert_eq!(
            store.grant(1, BadgeKind::TwentyPosts).await.unwrap(),
            GrantOutcome::Granted
        );
        assert_eq!(
            store.grant(1, BadgeKind::TwentyPosts).await.unwrap(),
            GrantOutcome::AlreadyExists
        );
        assert!(store.has_grant(1, BadgeKind::TwentyPosts).await.unwrap());
        assert!(!store.has_grant(1, BadgeKind::OneYearGroup).await.unwrap());
        assert_eq!(store.count_grants(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_grant_single_winner() {
        let store = store_with_group(1);

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.grant(1, BadgeKind::OneYearGroup).await.unwrap()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_granted() {
                granted += 1;
            }
        }

        assert_eq!(granted, 1);
        assert_eq!(store.grant_count(), 1);
    }

    #[tokio::test]
    async fn test_list_grants_scoped_to_group() {
        let store = store_with_group(1);
        store.upsert_group(GroupActivity::new(2, Utc::now(), 0));

        store.insert_grant(1, BadgeKind::TwentyPosts);
        store.insert_grant(1, BadgeKind::SevenDayStreak);
        store.insert_grant(2, BadgeKind::TwentyPosts);

        let grants = store.list_grants(1).await.unwrap();
        assert_eq!(grants.len(), 2);
        assert!(grants.iter().all(|g| g.group_id == 1));
        assert_eq!(grants[0].badge_kind, BadgeKind::TwentyPosts);
    }

    #[tokio::test]
    async fn test_snapshot_missing_group() {
        let store = store_with_group(1);
        assert!(store.snapshot(99).await.unwrap().is_none());

        store.remove_group(1);
        assert!(store.snapshot(1).await.unwrap().is_none());
        assert!(matches!(
            store.add_post(1, Utc::now(), 0),
            Err(BadgeError::GroupNotFound(1))
        ));
    }
}
