//! 结果输出模块
//!
//! 两个正交开关组合出四种输出行为：
//! - 反选：先对 `selected` 取反，再交给"仅在为真时输出"的闸门
//! - 详细程度：仅路径 / 路径+测量值 / 路径+测量值+格式信息

use super::utils;
use crate::core::{EvaluationResult, Measurements};
use std::io::{self, Write};
use std::path::Path;

/// 输出详细程度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// 原样输出路径
    Path,
    /// `'<path>' <rms> <dbfs>`
    Values,
    /// 在 `Values` 基础上追加 `<帧率>Hz <声道>ch <位深>bit <h:mm:ss.mmm>`
    Format,
}

/// 格式化一行输出（不含换行）
pub fn format_line(verbosity: Verbosity, path: &Path, audio: &Measurements) -> String {
    match verbosity {
        Verbosity::Path => path.display().to_string(),
        // dBFS 使用 Debug 格式，整数值也保留小数点（-10 → -10.0）
        Verbosity::Values => format!("'{}' {} {:?}", path.display(), audio.rms, audio.dbfs),
        Verbosity::Format => {
            let format = &audio.format;
            format!(
                "'{}' {} {:?} {}Hz {}ch {}bit {}",
                path.display(),
                audio.rms,
                audio.dbfs,
                format.sample_rate,
                format.channels,
                format.bits_per_sample,
                utils::fmt_hms(format.duration_millis())
            )
        }
    }
}

/// 结果输出器
pub struct Reporter<W: Write> {
    out: W,
    verbosity: Verbosity,
    invert: bool,
    reported: usize,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, verbosity: Verbosity, invert: bool) -> Self {
        Self {
            out,
            verbosity,
            invert,
            reported: 0,
        }
    }

    /// 输出一个文件的结果；`selected`（反选后）为假时什么也不输出
    pub fn report(&mut self, path: &Path, selected: bool, audio: &Measurements) -> io::Result<()> {
        if selected == self.invert {
            return Ok(());
        }
        writeln!(self.out, "{}", format_line(self.verbosity, path, audio))?;
        self.reported += 1;
        Ok(())
    }

    /// 求值器回调适配
    pub fn report_result(&mut self, result: &EvaluationResult) -> io::Result<()> {
        self.report(&result.path, result.selected, &result.measurements)
    }

    /// 已输出的行数
    pub fn reported(&self) -> usize {
        self.reported
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
