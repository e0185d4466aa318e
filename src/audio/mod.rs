//! 音频解码模块
//!
//! 解码器边界：给定文件路径和扩展名提示，输出响度测量快照与格式元数据。
//!
//! **使用 `UniversalDecoder`** - 按格式在 hound / symphonia / FFmpeg 之间回退

mod ffmpeg_bridge;
mod format;
pub mod loudness;

pub mod universal_decoder;

pub use ffmpeg_bridge::FFmpegDecoder;
pub use format::{AudioFormat, DEFAULT_BITS_PER_SAMPLE, FormatSupport};
pub use loudness::LoudnessAccumulator;
pub use universal_decoder::{AudioDecoder, PcmDecoder, SymphoniaDecoder, UniversalDecoder};
