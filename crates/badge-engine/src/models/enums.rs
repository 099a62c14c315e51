//! 徽章种类定义
//!
//! 封闭枚举，运行时不可扩展。支持数据库（sqlx）和 JSON（serde）序列化。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 徽章种类
///
/// 每个群组对每种徽章最多持有一次
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeKind {
    /// 连续七天发布回忆
    SevenDayStreak,
    /// 累计发布二十篇回忆
    TwentyPosts,
    /// 群组创建满一年
    OneYearGroup,
    /// 群组获得一万个赞
    TenThousandGroupLikes,
    /// 单篇回忆获得一万个赞
    TenThousandPostLikes,
}

impl BadgeKind {
    /// 全部徽章种类，评估时按此顺序遍历（顺序不影响结果）
    pub const ALL: [BadgeKind; 5] = [
        BadgeKind::SevenDayStreak,
        BadgeKind::TwentyPosts,
        BadgeKind::OneYearGroup,
        BadgeKind::TenThousandGroupLikes,
        BadgeKind::TenThousandPostLikes,
    ];

    /// 存储编码，与 badge_grants.badge_kind 列一致
    pub fn code(&self) -> &'static str {
        match self {
            Self::SevenDayStreak => "SEVEN_DAY_STREAK",
            Self::TwentyPosts => "TWENTY_POSTS",
            Self::OneYearGroup => "ONE_YEAR_GROUP",
            Self::TenThousandGroupLikes => "TEN_THOUSAND_GROUP_LIKES",
            Self::TenThousandPostLikes => "TEN_THOUSAND_POST_LIKES",
        }
    }

    /// 展示名称，沿用看板前端使用的文案
    pub fn label(&self) -> &'static str {
        match self {
            Self::SevenDayStreak => "7일 연속 추억 등록",
            Self::TwentyPosts => "추억 수 20개 이상 등록",
            Self::OneYearGroup => "그룹 생성 후 1년 달성",
            Self::TenThousandGroupLikes => "그룹 공간 1만 개 이상 받기",
            Self::TenThousandPostLikes => "추억 공감 1만 개 이상 받기",
        }
    }
}

impl fmt::Display for BadgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 无法识别的徽章编码
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("未知的徽章种类: {0}")]
pub struct ParseBadgeKindError(pub String);

impl FromStr for BadgeKind {
    type Err = ParseBadgeKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseBadgeKindError(s.to_string()))
    }
}
