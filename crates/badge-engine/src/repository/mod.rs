//! 数据访问层
//!
//! 提供引擎消费的三个外部契约及其实现。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据读写，不包含判定逻辑
//! - 使用 SQLx 进行类型安全的数据库操作
//! - 授予操作必须是原子的比较并设置，引擎自身不加锁
//! - 定义 trait 接口以支持 mock 测试

mod activity_repo;
mod ledger_repo;
mod memory_store;
mod traits;

pub use activity_repo::ActivityRepository;
pub use ledger_repo::BadgeLedgerRepository;
pub use memory_store::InMemoryBoardStore;
pub use traits::*;
