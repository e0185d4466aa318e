//! 音频格式信息模块
//!
//! 定义解码后音频的格式元数据（帧率、声道数、采样宽度、帧数）

use crate::error::{self, AudioResult};

/// 无法从编解码器获取位深时的默认采样宽度（有损格式统一按16位PCM度量）
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;

/// 音频格式信息
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFormat {
    /// 帧率（每秒帧数，即采样率）
    pub sample_rate: u32,
    pub channels: u16,
    /// 源音频的采样宽度（位）
    ///
    /// RMS 以该宽度下的整数样本为单位计算，dBFS 的满幅参考值也由它决定。
    pub bits_per_sample: u16,
    /// 每声道帧数
    pub sample_count: u64,
}

impl AudioFormat {
    /// 创建新的音频格式
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16, sample_count: u64) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
            sample_count,
        }
    }

    /// 验证格式参数的有效性
    pub fn validate(&self) -> AudioResult<()> {
        if self.sample_rate == 0 {
            return Err(error::format_error("采样率不能为0 / sample rate is 0", ""));
        }
        if self.channels == 0 {
            return Err(error::format_error("声道数不能为0 / channel count is 0", ""));
        }
        if ![8, 16, 24, 32, 64].contains(&self.bits_per_sample) {
            return Err(error::format_error(
                "不支持的位深度 / unsupported bit depth",
                format!("{}位（仅支持 8/16/24/32/64）", self.bits_per_sample),
            ));
        }
        Ok(())
    }

    /// 每样本字节数（采样宽度）
    pub fn sample_width(&self) -> usize {
        (self.bits_per_sample / 8) as usize
    }

    /// 每帧字节数 = 采样宽度 × 声道数
    pub fn frame_width(&self) -> usize {
        self.sample_width() * self.channels as usize
    }

    /// 满幅参考值：2^(位深-1)
    pub fn max_possible_amplitude(&self) -> f64 {
        2f64.powi(self.bits_per_sample as i32 - 1)
    }

    /// 获取持续时长（毫秒，向下取整）
    pub fn duration_millis(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.sample_count.saturating_mul(1000) / self.sample_rate as u64
    }

    /// 更新帧数（解码结束后用实际解码帧数覆盖容器估算值）
    pub fn update_sample_count(&mut self, sample_count: u64) {
        self.sample_count = sample_count;
    }
}

/// 格式支持信息
#[derive(Debug, Clone)]
pub struct FormatSupport {
    /// 支持的文件扩展名
    pub extensions: &'static [&'static str],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths_and_amplitude() {
        let format = AudioFormat::new(44100, 2, 16, 44100);
        assert_eq!(format.sample_width(), 2);
        assert_eq!(format.frame_width(), 4);
        assert_eq!(format.max_possible_amplitude(), 32768.0);
        assert_eq!(format.duration_millis(), 1000);

        let format = AudioFormat::new(48000, 1, 24, 24000);
        assert_eq!(format.max_possible_amplitude(), 8388608.0);
        assert_eq!(format.duration_millis(), 500);
    }

    #[test]
    fn test_validate_rejects_degenerate_formats() {
        assert!(AudioFormat::new(0, 2, 16, 0).validate().is_err());
        assert!(AudioFormat::new(44100, 0, 16, 0).validate().is_err());
        assert!(AudioFormat::new(44100, 2, 12, 0).validate().is_err());
        // 多声道不受限制（响度筛选不区分声道布局）
        assert!(AudioFormat::new(44100, 6, 24, 0).validate().is_ok());
    }

    #[test]
    fn test_zero_rate_duration_is_zero() {
        let format = AudioFormat::new(0, 2, 16, 1000);
        assert_eq!(format.duration_millis(), 0);
    }
}
