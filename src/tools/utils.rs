//! 工具函数模块
//!
//! 提供时长/范围格式化、并发度计算等通用工具函数。

use super::constants::parallel_limits::{MAX_PARALLEL_DEGREE, MIN_PARALLEL_DEGREE};

/// 毫秒数格式化为 `h:mm:ss.mmm`
pub fn fmt_hms(millis: u64) -> String {
    let (s, ms) = (millis / 1000, millis % 1000);
    let (m, s) = (s / 60, s % 60);
    let (h, m) = (m / 60, m % 60);
    format!("{h}:{m:02}:{s:02}.{ms:03}")
}

/// 格式化区间边界（无界端显示为 `-inf` / `inf`）
#[inline]
pub fn format_bound(value: f64) -> String {
    format!("{value}")
}

/// 格式化闭区间 `[low, high]`
pub fn format_range(low: f64, high: f64) -> String {
    format!("[{}, {}]", format_bound(low), format_bound(high))
}

/// 将请求的并发度限制在合法范围内
#[inline]
pub fn effective_parallel_degree(requested: usize) -> usize {
    requested.clamp(MIN_PARALLEL_DEGREE, MAX_PARALLEL_DEGREE)
}
