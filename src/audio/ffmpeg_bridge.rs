//! FFmpeg桥接解码器
//!
//! 为Symphonia不支持的格式（wma）提供FFmpeg回退方案：
//! ffprobe 读取帧率/声道数，ffmpeg 通过管道输出 S16LE，边读边累加，内存恒定。

use crate::core::Measurements;
use crate::error::{AudioError, AudioResult};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use super::format::{AudioFormat, FormatSupport};
use super::loudness::LoudnessAccumulator;
use super::universal_decoder::AudioDecoder;

/// FFmpeg输出固定为16位PCM
const FFMPEG_BITS_PER_SAMPLE: u16 = 16;

/// 每次从管道读取的字节数
const PIPE_READ_BYTES: usize = 64 * 1024;

/// FFmpeg管道解码器
pub struct FFmpegDecoder;

impl FFmpegDecoder {
    /// 检测FFmpeg是否可用（结果在进程内缓存）
    pub fn is_available() -> bool {
        static AVAILABLE: OnceLock<bool> = OnceLock::new();
        *AVAILABLE.get_or_init(|| {
            Self::find_ffmpeg_path().is_some() && Self::responds(Path::new(ffprobe_name()))
        })
    }

    fn responds(program: &Path) -> bool {
        Command::new(program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// 查找FFmpeg可执行文件路径（跨平台）
    fn find_ffmpeg_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let mut candidates = vec![
                PathBuf::from("ffmpeg.exe"),
                PathBuf::from(r"C:\Program Files\ffmpeg\bin\ffmpeg.exe"),
                PathBuf::from(r"C:\ffmpeg\bin\ffmpeg.exe"),
            ];
            // 便携部署：与可执行文件同目录
            if let Ok(exe) = std::env::current_exe()
                && let Some(dir) = exe.parent()
            {
                candidates.push(dir.join("ffmpeg.exe"));
            }
            candidates.into_iter().find(|p| Self::responds(p))
        }

        #[cfg(not(target_os = "windows"))]
        {
            let path = PathBuf::from("ffmpeg");
            Self::responds(&path).then_some(path)
        }
    }

    /// 使用ffprobe探测帧率和声道数
    fn probe_format(path: &Path) -> AudioResult<AudioFormat> {
        let output = Command::new(ffprobe_name())
            .args([
                "-v",
                "error",
                "-select_streams",
                "a:0",
                "-show_entries",
                "stream=sample_rate,channels",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                AudioError::FormatError(format!("无法运行ffprobe / failed to run ffprobe: {e}"))
            })?;

        if !output.status.success() {
            return Err(AudioError::FormatError(format!(
                "ffprobe失败 / ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    /// S16LE字节流累加到响度累加器，返回未成对的尾字节
    fn accumulate_s16le(bytes: &[u8], acc: &mut LoudnessAccumulator) -> usize {
        let chunks = bytes.chunks_exact(2);
        let remainder = chunks.remainder().len();
        for chunk in chunks {
            acc.push_int(i16::from_le_bytes([chunk[0], chunk[1]]) as i32);
        }
        remainder
    }
}

fn ffprobe_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "ffprobe.exe"
    } else {
        "ffprobe"
    }
}

/// 解析ffprobe输出：第一行采样率，第二行声道数
fn parse_probe_output(stdout: &str) -> AudioResult<AudioFormat> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());

    let (Some(rate), Some(channels)) = (lines.next(), lines.next()) else {
        return Err(AudioError::FormatError(
            "ffprobe输出不完整 / incomplete ffprobe output".to_string(),
        ));
    };

    let sample_rate = rate.parse::<u32>().map_err(|e| {
        AudioError::FormatError(format!("无效的采样率 / invalid sample rate '{rate}': {e}"))
    })?;
    let channels = channels.parse::<u16>().map_err(|e| {
        AudioError::FormatError(format!("无效的声道数 / invalid channel count '{channels}': {e}"))
    })?;

    Ok(AudioFormat::new(
        sample_rate,
        channels,
        FFMPEG_BITS_PER_SAMPLE,
        0,
    ))
}

impl AudioDecoder for FFmpegDecoder {
    fn name(&self) -> &'static str {
        "FFmpeg Decoder"
    }

    fn supported_formats(&self) -> &FormatSupport {
        static SUPPORT: FormatSupport = FormatSupport {
            extensions: &["wma", "mp3", "m4a", "ogg", "wav"],
        };
        &SUPPORT
    }

    fn decode(&self, path: &Path, _hint: &str) -> AudioResult<Measurements> {
        let ffmpeg_path = Self::find_ffmpeg_path().ok_or_else(|| {
            AudioError::FormatError("FFmpeg不可用 / FFmpeg not available".to_string())
        })?;

        let mut format = Self::probe_format(path)?;
        format.validate()?;

        let mut child = Command::new(&ffmpeg_path)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-f", "s16le", "-acodec", "pcm_s16le", "-"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                AudioError::DecodingError(format!("无法启动FFmpeg / failed to spawn FFmpeg: {e}"))
            })?;

        let mut stdout = child.stdout.take().ok_or_else(|| {
            AudioError::DecodingError(
                "FFmpeg标准输出不可用 / FFmpeg stdout unavailable".to_string(),
            )
        })?;

        let mut acc = LoudnessAccumulator::new(FFMPEG_BITS_PER_SAMPLE);
        let mut buffer = vec![0u8; PIPE_READ_BYTES];
        // 管道读取可能在样本中间截断，保留奇数尾字节拼到下一次读取
        let mut carry = 0usize;

        let read_result = loop {
            match stdout.read(&mut buffer[carry..]) {
                Ok(0) => break Ok(()),
                Ok(n) => {
                    let filled = carry + n;
                    let rest = Self::accumulate_s16le(&buffer[..filled], &mut acc);
                    buffer.copy_within(filled - rest..filled, 0);
                    carry = rest;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => break Err(e),
            }
        };

        drop(stdout);
        let status = child.wait()?;

        if let Err(e) = read_result {
            return Err(AudioError::DecodingError(format!(
                "FFmpeg读取失败 / failed to read from FFmpeg: {e}"
            )));
        }
        if !status.success() || acc.sample_count() == 0 {
            return Err(AudioError::DecodingError(format!(
                "FFmpeg解码失败 / FFmpeg decode failed ({status})"
            )));
        }

        format.update_sample_count(acc.sample_count() / format.channels as u64);
        Ok(acc.finish(format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_availability() {
        // 仅记录结果，是否安装FFmpeg取决于运行环境
        let available = FFmpegDecoder::is_available();
        println!("FFmpeg available / FFmpeg可用: {available}");
    }

    #[test]
    fn test_s16le_accumulation() {
        let bytes = [
            0x00, 0x40, // 16384
            0x00, 0xC0, // -16384
            0x00, 0x40, // 16384
            0x7F, // 奇数尾字节
        ];

        let mut acc = LoudnessAccumulator::new(16);
        let rest = FFmpegDecoder::accumulate_s16le(&bytes, &mut acc);
        assert_eq!(rest, 1);
        assert_eq!(acc.sample_count(), 3);
        assert_eq!(acc.rms(), 16384);
    }

    #[test]
    fn test_parse_probe_output() {
        let format = parse_probe_output("44100\n2\n").unwrap();
        assert_eq!(format.sample_rate, 44100);
        assert_eq!(format.channels, 2);
        assert_eq!(format.bits_per_sample, 16);

        assert!(parse_probe_output("44100\n").is_err());
        assert!(parse_probe_output("N/A\n2\n").is_err());
    }
}
