//! 徽章条件判定
//!
//! 五个相互独立的纯函数，输入群组活动快照，输出条件当前是否成立。
//! 判定只借用快照，不会修改它；多个条件可以在同一次评估中同时成立。

use chrono::{DateTime, Duration, Utc};

use crate::models::{BadgeKind, GroupActivity};

/// 连续发布天数阈值
pub const STREAK_DAYS: usize = 7;
/// 帖子数阈值
pub const POST_COUNT_THRESHOLD: usize = 20;
/// 群组年龄阈值（天，按实际经过时长计算）
pub const GROUP_AGE_DAYS: i64 = 365;
/// 群组点赞数阈值
pub const GROUP_LIKES_THRESHOLD: i64 = 10_000;
/// 单帖点赞数阈值
pub const POST_LIKES_THRESHOLD: i64 = 10_000;

/// 计算最长的按日连续发布长度
///
/// 帖子按创建时间倒序排列后，相邻两帖的 UTC 日历日期恰好相差一天则连续数加一，
/// 否则重置为 1。同一天的两帖（相差 0 天）同样视为中断。
pub fn longest_daily_streak(activity: &GroupActivity) -> usize {
    let dates: Vec<_> = activity
        .post_times_newest_first()
        .into_iter()
        .map(|t| t.date_naive())
        .collect();

    if dates.is_empty() {
        return 0;
    }

    let mut longest = 1;
    let mut current = 1;
    for pair in dates.windows(2) {
        if pair[0].signed_duration_since(pair[1]).num_days() == 1 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 1;
        }
    }
    longest
}

/// 连续七天发布
pub fn has_seven_day_streak(activity: &GroupActivity) -> bool {
    longest_daily_streak(activity) >= STREAK_DAYS
}

/// 累计二十篇
pub fn has_twenty_posts(activity: &GroupActivity) -> bool {
    activity.post_count() >= POST_COUNT_THRESHOLD
}

/// 群组创建满一年（365 天实际时长，不按日历日截断）
pub fn is_one_year_group(activity: &GroupActivity, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(activity.created_at) >= Duration::days(GROUP_AGE_DAYS)
}

/// 群组累计一万赞
pub fn has_ten_thousand_group_likes(activity: &GroupActivity) -> bool {
    activity.like_count >= GROUP_LIKES_THRESHOLD
}

/// 任意单帖一万赞（不是各帖之和）
pub fn has_ten_thousand_post_likes(activity: &GroupActivity) -> bool {
    activity
        .posts
        .iter()
        .any(|post| post.like_count >= POST_LIKES_THRESHOLD)
}

/// 判定某种徽章的条件是否成立
pub fn is_satisfied(kind: BadgeKind, activity: &GroupActivity, now: DateTime<Utc>) -> bool {
    match kind {
        BadgeKind::SevenDayStreak => has_seven_day_streak(activity),
        BadgeKind::TwentyPosts => has_twenty_posts(activity),
        BadgeKind::OneYearGroup => is_one_year_group(activity, now),
        BadgeKind::TenThousandGroupLikes => has_ten_thousand_group_likes(activity),
        BadgeKind::TenThousandPostLikes => has_ten_thousand_post_likes(activity),
    }
}

/// 返回当前成立的全部徽章种类
pub fn satisfied_kinds(activity: &GroupActivity, now: DateTime<Utc>) -> Vec<BadgeKind> {
    BadgeKind::ALL
        .into_iter()
        .filter(|kind| is_satisfied(*kind, activity, now))
        .collect()
}
