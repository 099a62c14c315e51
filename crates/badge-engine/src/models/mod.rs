//! 领域模型
//!
//! - `enums`: 徽章种类
//! - `activity`: 群组活动快照
//! - `grant`: 徽章授予事实

mod activity;
mod enums;
mod grant;

pub use activity::{GroupActivity, PostActivity};
pub use enums::{BadgeKind, ParseBadgeKindError};
pub use grant::{BadgeGrant, GrantOutcome};
