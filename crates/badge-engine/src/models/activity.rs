//! 群组活动快照
//!
//! 单次评估的输入。由活动读取器在一个时间点一致地读出，判定过程只读不改。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单篇回忆的活动数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostActivity {
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
}

impl PostActivity {
    pub fn new(created_at: DateTime<Utc>, like_count: i64) -> Self {
        Self {
            created_at,
            like_count,
        }
    }
}

/// 群组活动快照
///
/// posts 不保证有序，需要顺序的判定自行排序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupActivity {
    pub group_id: i64,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub posts: Vec<PostActivity>,
}

impl GroupActivity {
    pub fn new(group_id: i64, created_at: DateTime<Utc>, like_count: i64) -> Self {
        Self {
            group_id,
            created_at,
            like_count,
            posts: Vec::new(),
        }
    }

    pub fn with_posts(mut self, posts: Vec<PostActivity>) -> Self {
        self.posts = posts;
        self
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// 按创建时间倒序返回帖子创建时间（最新在前）
    pub fn post_times_newest_first(&self) -> Vec<DateTime<Utc>> {
        let mut times: Vec<_> = self.posts.iter().map(|p| p.created_at).collect();
        times.sort_unstable_by(|a, b| b.cmp(a));
        times
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_post_times_newest_first() {
        let t = |d| Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap();
        let activity = GroupActivity::new(1, t(1), 0).with_posts(vec![
            PostActivity::new(t(2), 0),
            PostActivity::new(t(5), 0),
            PostActivity::new(t(3), 0),
        ]);

        assert_eq!(activity.post_times_newest_first(), vec![t(5), t(3), t(2)]);
        // 原始顺序不变
        assert_eq!(activity.posts[0].created_at, t(2));
        assert_eq!(activity.post_count(), 3);
    }
}
