//! 徽章评估引擎
//!
//! 周期性扫描所有群组的活动记录，在满足条件时为群组授予一次性成就徽章。
//!
//! ## 核心功能
//!
//! - **活动快照**：按群组读取创建时间、点赞数和帖子列表的时间点一致视图
//! - **条件判定**：五个相互独立的纯函数（连续七天、二十篇、一周年、群组万赞、单帖万赞）
//! - **幂等授予**：依赖 (group_id, badge_kind) 唯一约束，重复或并发评估最多授予一次
//! - **周期扫描**：固定间隔触发，群组间有界并发，单个群组失败互不影响
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `predicate`: 徽章条件判定
//! - `repository`: 活动读取与徽章账本
//! - `service`: 单群组评估服务
//! - `worker`: 周期扫描 Worker

pub mod error;
pub mod models;
pub mod predicate;
pub mod repository;
pub mod service;
pub mod worker;

pub use error::{BadgeError, Result};
pub use models::*;
pub use repository::{
    ActivityReader, ActivityRepository, BadgeLedger, BadgeLedgerRepository, GroupDirectory,
    InMemoryBoardStore,
};
pub use service::{BadgeEvaluator, EvaluationReport};
pub use worker::{BadgeScanWorker, TickSummary};
