//! 统一音频解码器
//!
//! 解码文件并直接产出响度测量快照：
//! - `PcmDecoder`：hound 解码 WAV（最快路径，整数样本无损）
//! - `SymphoniaDecoder`：symphonia 解码 mp3 / m4a / ogg / wav
//! - `FFmpegDecoder`：symphonia 无法处理的容器（wma）回退到 FFmpeg 管道
//!
//! `UniversalDecoder` 按格式提示依次尝试，全部失败时返回最后一个错误。
//! 是否跳过失败文件由调用方（求值器）决定，解码器本身只负责如实返回 `Result`。

use super::ffmpeg_bridge::FFmpegDecoder;
use super::format::{AudioFormat, DEFAULT_BITS_PER_SAMPLE, FormatSupport};
use super::loudness::LoudnessAccumulator;
use crate::core::Measurements;
use crate::error::{self, AudioError, AudioResult};
use std::path::Path;

/// 音频解码器trait
///
/// 实现必须可跨线程共享（并行模式下多个工作线程同时调用 `decode`）。
pub trait AudioDecoder: Send + Sync {
    /// 获取解码器名称
    fn name(&self) -> &'static str;

    /// 获取支持的格式信息
    fn supported_formats(&self) -> &FormatSupport;

    /// 检测扩展名提示是否在支持列表中（区分大小写）
    fn can_decode(&self, hint: &str) -> bool {
        self.supported_formats().extensions.contains(&hint)
    }

    /// 完整解码文件并计算测量值
    ///
    /// `hint` 为去掉前导点的扩展名（如 `"mp3"`），用作容器格式提示。
    fn decode(&self, path: &Path, hint: &str) -> AudioResult<Measurements>;
}

/// PCM解码器 - 使用hound处理WAV
pub struct PcmDecoder;

impl AudioDecoder for PcmDecoder {
    fn name(&self) -> &'static str {
        "PCM Decoder (hound)"
    }

    fn supported_formats(&self) -> &FormatSupport {
        static SUPPORT: FormatSupport = FormatSupport {
            extensions: &["wav"],
        };
        &SUPPORT
    }

    fn decode(&self, path: &Path, _hint: &str) -> AudioResult<Measurements> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let mut format = AudioFormat::new(
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            reader.duration() as u64,
        );
        format.validate()?;

        let mut acc = LoudnessAccumulator::new(format.bits_per_sample);
        match spec.sample_format {
            hound::SampleFormat::Int => {
                for sample in reader.samples::<i32>() {
                    acc.push_int(sample?);
                }
            }
            hound::SampleFormat::Float => {
                for sample in reader.samples::<f32>() {
                    acc.push_normalized(sample? as f64);
                }
            }
        }

        // 以实际读到的帧数为准（头部长度字段可能与数据不符）
        format.update_sample_count(acc.sample_count() / format.channels as u64);
        Ok(acc.finish(format))
    }
}

/// Symphonia通用解码器
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn name(&self) -> &'static str {
        "Symphonia Decoder"
    }

    fn supported_formats(&self) -> &FormatSupport {
        static SUPPORT: FormatSupport = FormatSupport {
            extensions: &["mp3", "m4a", "ogg", "wav"],
        };
        &SUPPORT
    }

    fn decode(&self, path: &Path, hint_ext: &str) -> AudioResult<Measurements> {
        use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
        use symphonia::core::errors::Error as SymphoniaError;
        use symphonia::core::formats::FormatOptions;
        use symphonia::core::io::MediaSourceStream;
        use symphonia::core::meta::MetadataOptions;
        use symphonia::core::probe::Hint;

        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(hint_ext);

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| error::format_error("格式探测失败 / probe failed", e))?;

        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                AudioError::FormatError("未找到音频轨道 / no audio track".to_string())
            })?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| error::format_error("创建解码器失败 / cannot create decoder", e))?;

        let mut sample_rate = codec_params.sample_rate;
        let mut channels = codec_params.channels.map(|ch| ch.count() as u16);
        let bits_per_sample = detect_bit_depth(&codec_params);

        let mut acc = LoudnessAccumulator::new(bits_per_sample);
        let mut frames = 0u64;

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(error::decoding_error("读取包失败 / packet read failed", e)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(audio_buf) => {
                    let spec = audio_buf.spec();
                    if sample_rate.is_none() {
                        sample_rate = Some(spec.rate);
                    }
                    if channels.is_none() {
                        channels = Some(spec.channels.count() as u16);
                    }
                    frames += audio_buf.frames() as u64;
                    accumulate_buffer(&audio_buf, &mut acc);
                }
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                // 单个损坏包跳过，与整文件失败区分
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(error::decoding_error("解码失败 / decode failed", e)),
            }
        }

        if frames == 0 {
            return Err(AudioError::DecodingError(
                "未解码到任何样本 / no samples decoded".to_string(),
            ));
        }

        let sample_rate = sample_rate.ok_or_else(|| {
            AudioError::FormatError("无法获取采样率信息 / sample rate unknown".to_string())
        })?;
        let channels = channels.ok_or_else(|| {
            AudioError::FormatError("无法获取声道数信息 / channel count unknown".to_string())
        })?;

        let format = AudioFormat::new(sample_rate, channels, bits_per_sample, frames);
        format.validate()?;
        Ok(acc.finish(format))
    }
}

/// 检测位深度：优先使用编解码器参数，否则按PCM类型推断，有损格式按16位度量
fn detect_bit_depth(codec_params: &symphonia::core::codecs::CodecParameters) -> u16 {
    use symphonia::core::codecs::*;

    if let Some(bits) = codec_params.bits_per_sample {
        return bits as u16;
    }
    match codec_params.codec {
        CODEC_TYPE_PCM_U8 | CODEC_TYPE_PCM_S8 => 8,
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => 16,
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => 24,
        CODEC_TYPE_PCM_S32LE
        | CODEC_TYPE_PCM_S32BE
        | CODEC_TYPE_PCM_F32LE
        | CODEC_TYPE_PCM_F32BE => 32,
        _ => DEFAULT_BITS_PER_SAMPLE,
    }
}

/// 按平面累加一个声道块的样本（声道顺序不影响平方和）
macro_rules! accumulate_planes {
    ($buf:expr, $acc:expr, $convert:expr) => {{
        let buf = $buf;
        for ch in 0..buf.spec().channels.count() {
            for &sample in buf.chan(ch) {
                $acc.push_normalized($convert(sample));
            }
        }
    }};
}

/// 将symphonia缓冲区的样本归一化后累加
fn accumulate_buffer(
    audio_buf: &symphonia::core::audio::AudioBufferRef,
    acc: &mut LoudnessAccumulator,
) {
    use symphonia::core::audio::{AudioBufferRef, Signal};
    use symphonia::core::sample::{i24, u24};

    match audio_buf {
        AudioBufferRef::F32(buf) => accumulate_planes!(buf, acc, |s: f32| s as f64),
        AudioBufferRef::F64(buf) => accumulate_planes!(buf, acc, |s: f64| s),
        AudioBufferRef::S8(buf) => accumulate_planes!(buf, acc, |s: i8| s as f64 / 128.0),
        AudioBufferRef::S16(buf) => accumulate_planes!(buf, acc, |s: i16| s as f64 / 32768.0),
        AudioBufferRef::S24(buf) => {
            accumulate_planes!(buf, acc, |s: i24| s.inner() as f64 / 8388608.0)
        }
        AudioBufferRef::S32(buf) => {
            accumulate_planes!(buf, acc, |s: i32| s as f64 / 2147483648.0)
        }
        AudioBufferRef::U8(buf) => accumulate_planes!(buf, acc, |s: u8| (s as f64 - 128.0) / 128.0),
        AudioBufferRef::U16(buf) => {
            accumulate_planes!(buf, acc, |s: u16| (s as f64 - 32768.0) / 32768.0)
        }
        AudioBufferRef::U24(buf) => {
            accumulate_planes!(buf, acc, |s: u24| (s.inner() as f64 - 8388608.0) / 8388608.0)
        }
        AudioBufferRef::U32(buf) => {
            accumulate_planes!(buf, acc, |s: u32| (s as f64 - 2147483648.0) / 2147483648.0)
        }
    }
}

/// 统一解码器：按格式提示在各后端之间回退
pub struct UniversalDecoder {
    backends: Vec<Box<dyn AudioDecoder>>,
}

impl UniversalDecoder {
    /// 创建统一解码器（FFmpeg 可用时自动挂载为最后的后备）
    pub fn new() -> Self {
        let mut backends: Vec<Box<dyn AudioDecoder>> =
            vec![Box::new(PcmDecoder), Box::new(SymphoniaDecoder)];
        if FFmpegDecoder::is_available() {
            backends.push(Box::new(FFmpegDecoder));
        } else {
            log::debug!(
                "未检测到FFmpeg，wma等格式将被跳过 / FFmpeg not found, wma files will be skipped"
            );
        }
        Self { backends }
    }

    /// 仅使用内置Rust解码器（不探测FFmpeg，测试用）
    pub fn builtin() -> Self {
        Self {
            backends: vec![Box::new(PcmDecoder), Box::new(SymphoniaDecoder)],
        }
    }
}

impl Default for UniversalDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDecoder for UniversalDecoder {
    fn name(&self) -> &'static str {
        "Universal Decoder"
    }

    fn supported_formats(&self) -> &FormatSupport {
        static SUPPORT: FormatSupport = FormatSupport {
            extensions: crate::tools::constants::RECOGNIZED_EXTENSIONS,
        };
        &SUPPORT
    }

    fn decode(&self, path: &Path, hint: &str) -> AudioResult<Measurements> {
        // 打不开的文件换后端也无济于事；读取中途的错误（如截断）仍交给下一个后端
        std::fs::File::open(path)?;

        let mut last_error = None;

        for backend in self.backends.iter().filter(|b| b.can_decode(hint)) {
            match backend.decode(path, hint) {
                Ok(measurements) => return Ok(measurements),
                Err(e) => {
                    log::trace!("{} 解码失败 / failed on {}: {e}", backend.name(), path.display());
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AudioError::FormatError(format!("没有可用的解码器 / no decoder for .{hint}"))
        }))
    }
}
