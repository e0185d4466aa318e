//! 工具模块集合
//!
//! 包含CLI、路径输入、结果输出等胶水层模块，支持main.rs的流程控制。

pub mod cli;
pub mod constants;
pub mod input;
pub mod reporter;
pub mod utils;

// 重新导出主要的公共接口
pub use cli::{AppConfig, parse_args, try_parse_from};
pub use input::{read_paths, stdin_paths};
pub use reporter::{Reporter, Verbosity, format_line};
pub use utils::fmt_hms;
