//! 响度测量类型
//!
//! 每个文件解码后得到一份测量快照，只在本次求值中使用，不缓存也不持久化。

use crate::audio::AudioFormat;
use std::fmt;

/// 可筛选的测量量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementKind {
    /// 均方根能量（源采样宽度下的整数刻度，非负）
    Rms,
    /// 相对满幅的分贝值（通常 ≤ 0）
    Dbfs,
}

impl MeasurementKind {
    /// 命令行/日志中使用的名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rms => "rms",
            Self::Dbfs => "dbfs",
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 单个文件的测量快照（解码器输出）
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements {
    pub rms: u64,
    pub dbfs: f64,
    pub format: AudioFormat,
}

impl Measurements {
    pub fn new(rms: u64, dbfs: f64, format: AudioFormat) -> Self {
        Self { rms, dbfs, format }
    }

    /// 按种类读取标量值
    #[inline]
    pub fn value(&self, kind: MeasurementKind) -> f64 {
        match kind {
            MeasurementKind::Rms => self.rms as f64,
            MeasurementKind::Dbfs => self.dbfs,
        }
    }
}
