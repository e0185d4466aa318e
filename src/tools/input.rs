//! 路径输入模块
//!
//! 路径来源：命令行位置参数，或（未提供时）标准输入逐行读取。
//! 每行去除首尾空白，空行跳过。

use std::io::BufRead;
use std::path::{Path, PathBuf};

/// 从行读取器中逐行产出路径（惰性，边读边处理）
///
/// 按原始字节切分行，非UTF-8的路径同样可用；单行无法转换时只跳过该行。
/// 底层读取出错时记录警告并结束。
pub fn read_paths<R: BufRead>(reader: R) -> impl Iterator<Item = PathBuf> {
    reader
        .split(b'\n')
        .map_while(|line| match line {
            Ok(line) => Some(line),
            Err(e) => {
                log::warn!("标准输入读取失败，停止读取 / stdin read failed: {e}");
                None
            }
        })
        .filter_map(|line| {
            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                return None;
            }
            path_from_bytes(trimmed)
        })
}

/// 标准输入路径流
pub fn stdin_paths() -> impl Iterator<Item = PathBuf> {
    read_paths(std::io::stdin().lock())
}

/// 去除路径首尾空白（命令行参数与标准输入行一致处理）
pub fn trim_path(path: &Path) -> PathBuf {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        path_from_bytes(path.as_os_str().as_bytes().trim_ascii())
            .unwrap_or_else(|| path.to_path_buf())
    }

    #[cfg(not(unix))]
    {
        match path.to_str() {
            Some(s) => PathBuf::from(s.trim()),
            None => path.to_path_buf(),
        }
    }
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> Option<PathBuf> {
    use std::os::unix::ffi::OsStrExt;
    Some(PathBuf::from(std::ffi::OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> Option<PathBuf> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Some(PathBuf::from(s)),
        Err(e) => {
            log::warn!("跳过非UTF-8路径行 / skipping non-UTF-8 line: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_lines_trimmed_and_blank_skipped() {
        let input = "  /music/a.mp3  \n\n\t\n/music/b.wav\r\n   \nlast.ogg";
        let paths: Vec<PathBuf> = read_paths(Cursor::new(input)).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/music/a.mp3"),
                PathBuf::from("/music/b.wav"),
                PathBuf::from("last.ogg"),
            ]
        );
    }

    #[test]
    fn test_invalid_utf8_line_does_not_stop_reading() {
        let input: &[u8] = b"a.mp3\n\xffbad.mp3\nb.mp3\nc.mp3\n";
        let paths: Vec<PathBuf> = read_paths(Cursor::new(input)).collect();

        assert_eq!(paths.first(), Some(&PathBuf::from("a.mp3")));
        assert!(paths.ends_with(&[PathBuf::from("b.mp3"), PathBuf::from("c.mp3")]));

        // unix 下非UTF-8字节本身就是合法路径
        #[cfg(unix)]
        assert_eq!(paths.len(), 4);
        #[cfg(not(unix))]
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn test_trim_path() {
        assert_eq!(trim_path(Path::new("  /music \t")), PathBuf::from("/music"));
        assert_eq!(trim_path(Path::new("song.mp3\n")), PathBuf::from("song.mp3"));
        assert_eq!(trim_path(Path::new("plain.wav")), PathBuf::from("plain.wav"));
    }
}
