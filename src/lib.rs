//! audioselect - 基于响度的音频文件筛选工具
//!
//! 遍历文件或目录树，解码可识别的音频文件（mp3 / wma / wav / m4a / ogg），
//! 按 RMS 与 dBFS 区间筛选，输出满足（或不满足）条件的文件路径。
//!
//! ## 核心组成
//! - `audio`：解码器边界，输出测量快照（RMS、dBFS、格式元数据）
//! - `core`：区间谓词、组合筛选器、树形求值器
//! - `tools`：命令行、路径输入、结果输出等胶水层
//!
//! 单文件失败（不可识别、损坏、超时）一律静默跳过，只有配置错误会终止运行。

pub mod audio;
pub mod core;
pub mod error;
pub mod tools;

// 重新导出核心类型
pub use audio::{AudioDecoder, AudioFormat, UniversalDecoder};
pub use core::{
    AudioSelector, EvaluationResult, EvaluationSummary, MeasurementKind, Measurements,
    ParallelOptions, Predicate, RangePredicate, TreeEvaluator,
};
pub use error::{AudioError, AudioResult};
