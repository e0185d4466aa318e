//! 核心筛选引擎
//!
//! - `measurement`：测量量与测量快照
//! - `selector`：区间谓词与组合筛选器
//! - `evaluator`：遍历目录树、解码、求值、回调

pub mod evaluator;
pub mod measurement;
pub mod selector;

pub use evaluator::{EvaluationResult, EvaluationSummary, ParallelOptions, TreeEvaluator};
pub use measurement::{MeasurementKind, Measurements};
pub use selector::{AudioSelector, Predicate, RangePredicate};
