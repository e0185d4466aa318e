//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// 可识别的音频扩展名（区分大小写，去掉前导点后作为解码器格式提示）
pub const RECOGNIZED_EXTENSIONS: &[&str] = &["mp3", "wma", "wav", "m4a", "ogg"];

/// 默认配置值
pub mod defaults {
    /// 并行模式下单文件解码超时（秒）
    ///
    /// 超时视同解码失败，文件被静默跳过
    pub const DECODE_TIMEOUT_SECS: u64 = 120;
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    ///
    /// 解码以CPU和磁盘I/O为主，超过16个工作线程收益有限
    pub const MAX_PARALLEL_DEGREE: usize = 16;
}

/// 进程退出码
pub mod exit_codes {
    /// 正常结束（无论匹配多少文件）
    pub const SUCCESS: i32 = 0;
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 配置/参数错误（与clap的用法错误一致）
    pub const CONFIG_ERROR: i32 = 2;
}
