//! 业务服务层
//!
//! - `evaluator`: 单群组徽章评估
//! - `dto`: 评估结果

pub mod dto;
mod evaluator;

pub use dto::EvaluationReport;
pub use evaluator::BadgeEvaluator;
