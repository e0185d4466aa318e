//! 响度累加器
//!
//! 在解码过程中流式累加平方和，解码结束时得到整段音频的 RMS 与 dBFS，
//! 不保留完整样本缓冲区，单文件内存占用恒定。
//!
//! - RMS：所有声道交错样本按源采样宽度还原为整数后计算，`floor(sqrt(Σs²/n))`
//! - dBFS：`20·log10(rms / 2^(bits-1))`，RMS 为 0 时为 -∞

use super::format::AudioFormat;
use crate::core::Measurements;

/// 流式平方和累加器
#[derive(Debug, Clone)]
pub struct LoudnessAccumulator {
    /// 满幅参考值（归一化样本 → 整数样本的缩放系数）
    scale: f64,
    sum_squares: f64,
    samples: u64,
}

impl LoudnessAccumulator {
    /// 按采样宽度创建累加器
    pub fn new(bits_per_sample: u16) -> Self {
        Self {
            scale: 2f64.powi(bits_per_sample as i32 - 1),
            sum_squares: 0.0,
            samples: 0,
        }
    }

    /// 累加归一化到 [-1.0, 1.0] 的浮点样本
    #[inline]
    pub fn push_normalized(&mut self, sample: f64) {
        // 归一化样本按满幅值还原为整数刻度，与整数路径保持一致
        let value = (sample * self.scale).round();
        self.sum_squares += value * value;
        self.samples += 1;
    }

    /// 累加归一化浮点样本切片
    pub fn extend_normalized(&mut self, samples: &[f32]) {
        for &s in samples {
            self.push_normalized(s as f64);
        }
    }

    /// 累加整数样本（已处于源采样宽度刻度）
    #[inline]
    pub fn push_int(&mut self, sample: i32) {
        let value = sample as f64;
        self.sum_squares += value * value;
        self.samples += 1;
    }

    /// 已累加的样本总数（所有声道）
    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    /// 整数 RMS（空流为 0）
    pub fn rms(&self) -> u64 {
        if self.samples == 0 {
            return 0;
        }
        (self.sum_squares / self.samples as f64).sqrt().floor() as u64
    }

    /// 结束累加，生成测量快照
    pub fn finish(&self, format: AudioFormat) -> Measurements {
        let rms = self.rms();
        let dbfs = ratio_to_db(rms as f64 / format.max_possible_amplitude());
        Measurements { rms, dbfs, format }
    }
}

/// 幅度比值转换为分贝；比值为 0 时返回 -∞
#[inline]
pub fn ratio_to_db(ratio: f64) -> f64 {
    if ratio > 0.0 {
        20.0 * ratio.log10()
    } else {
        f64::NEG_INFINITY
    }
}
