//! 统一错误处理框架
//!
//! 筛选流程中的错误分两类：
//! - 全局配置错误（范围上下界颠倒、参数组合非法）：启动前立即报告，程序不开始遍历
//! - 单文件错误（解码失败、文件读取失败）：在求值器内部就地吞掉，绝不终止整批任务

use std::fmt;
use std::io;

/// 音频处理相关的统一错误类型
#[derive(Debug)]
pub enum AudioError {
    /// 输入/配置验证错误（致命，启动前报告）
    InvalidInput(String),

    /// 文件I/O错误
    IoError(io::Error),

    /// 音频格式错误（容器无法识别、缺少音轨等）
    FormatError(String),

    /// 解码错误（数据损坏、编码不支持）
    DecodingError(String),

    /// 单文件解码超时（仅并行模式）
    Timeout(String),

    /// 资源访问错误（线程池创建失败等）
    ResourceError(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::InvalidInput(msg) => write!(f, "输入验证失败 / Invalid input: {msg}"),
            AudioError::IoError(err) => write!(f, "文件I/O错误 / I/O error: {err}"),
            AudioError::FormatError(msg) => write!(f, "音频格式错误 / Format error: {msg}"),
            AudioError::DecodingError(msg) => write!(f, "音频解码失败 / Decoding failed: {msg}"),
            AudioError::Timeout(msg) => write!(f, "解码超时 / Decode timed out: {msg}"),
            AudioError::ResourceError(msg) => write!(f, "资源访问错误 / Resource error: {msg}"),
        }
    }
}

impl std::error::Error for AudioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AudioError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for AudioError {
    fn from(err: io::Error) -> Self {
        AudioError::IoError(err)
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => AudioError::IoError(e),
            other => AudioError::DecodingError(format!("WAV解码错误 / WAV decode error: {other}")),
        }
    }
}

/// 音频处理操作的标准Result类型
pub type AudioResult<T> = Result<T, AudioError>;

// ==================== 错误转换Helper函数 ====================

/// 创建格式错误的helper函数
#[inline]
pub fn format_error<E: fmt::Display>(context: &str, err: E) -> AudioError {
    AudioError::FormatError(format!("{context}: {err}"))
}

/// 创建解码错误的helper函数
#[inline]
pub fn decoding_error<E: fmt::Display>(context: &str, err: E) -> AudioError {
    AudioError::DecodingError(format!("{context}: {err}"))
}

/// 创建配置错误的helper函数
#[inline]
pub fn invalid_input<E: fmt::Display>(context: &str, err: E) -> AudioError {
    AudioError::InvalidInput(format!("{context}: {err}"))
}

// ==================== 错误分类系统 ====================

/// 错误类别枚举（用于诊断日志和退出码映射）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ErrorCategory {
    /// 配置错误：唯一会终止运行的类别
    Config,
    /// 格式/解码错误（单文件，跳过）
    Decoding,
    /// I/O相关错误（文件不存在、权限不足、输出管道关闭等）
    Io,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从AudioError提取错误类别
    pub fn from_audio_error(e: &AudioError) -> Self {
        match e {
            AudioError::InvalidInput(_) => Self::Config,
            AudioError::FormatError(_) | AudioError::DecodingError(_) | AudioError::Timeout(_) => {
                Self::Decoding
            }
            AudioError::IoError(_) => Self::Io,
            AudioError::ResourceError(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Config => "配置错误 / config",
            Self::Decoding => "解码错误 / decoding",
            Self::Io => "I/O错误 / io",
            Self::Other => "其他错误 / other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            ErrorCategory::from_audio_error(&AudioError::InvalidInput("x".into())),
            ErrorCategory::Config
        );
        assert_eq!(
            ErrorCategory::from_audio_error(&decoding_error("bad", "frame")),
            ErrorCategory::Decoding
        );
        assert_eq!(
            ErrorCategory::from_audio_error(&AudioError::Timeout("slow.mp3".into())),
            ErrorCategory::Decoding
        );
        let io = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(
            ErrorCategory::from_audio_error(&AudioError::from(io)),
            ErrorCategory::Io
        );
    }

    #[test]
    fn test_helper_messages_carry_context() {
        let err = format_error("格式探测失败", "no track");
        assert!(err.to_string().contains("格式探测失败: no track"));

        let err = invalid_input("--rms", "low > high");
        assert!(matches!(err, AudioError::InvalidInput(ref m) if m == "--rms: low > high"));
    }

    #[test]
    fn test_io_error_exposes_source() {
        let err = AudioError::from(io::Error::other("boom"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&AudioError::Timeout("t".into())).is_none());
    }
}
