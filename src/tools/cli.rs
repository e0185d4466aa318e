//! 命令行接口模块
//!
//! 负责命令行参数解析、配置校验以及由配置构造筛选器。

use super::constants::defaults;
use super::input::trim_path;
use super::reporter::Verbosity;
use crate::core::{AudioSelector, ParallelOptions};
use crate::error::{AudioResult, invalid_input};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序配置
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// 待筛选的文件或目录；为空时从标准输入逐行读取
    pub files: Vec<PathBuf>,

    /// 输出测量值（RMS、dBFS）
    pub show_value: bool,

    /// 额外输出格式信息（帧率、声道、采样宽度、时长）
    pub show_format: bool,

    /// 反选：输出不满足条件的文件
    pub exclude: bool,

    /// RMS 闭区间
    pub rms: Option<(i64, i64)>,

    /// dBFS 闭区间
    pub dbfs: Option<(f64, f64)>,

    /// 多文件并行度（None 表示串行）
    pub parallel_files: Option<usize>,

    /// 并行模式下按路径排序输出
    pub sort_output: bool,

    /// 并行模式下单文件解码超时（秒）
    pub timeout_secs: Option<u64>,

    /// 是否显示详细诊断信息
    pub verbose: bool,
}

impl AppConfig {
    /// 校验参数组合；所有配置错误都在遍历开始前报告
    pub fn validate(&self) -> AudioResult<()> {
        if self.parallel_files == Some(0) {
            return Err(invalid_input("--parallel-files", "并发度至少为1 / must be at least 1"));
        }
        if self.parallel_files.is_none() {
            if self.sort_output {
                return Err(invalid_input(
                    "--sort",
                    "仅在并行模式下有效 / requires --parallel-files",
                ));
            }
            if self.timeout_secs.is_some() {
                return Err(invalid_input(
                    "--timeout",
                    "仅在并行模式下有效 / requires --parallel-files",
                ));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(invalid_input("--timeout", "超时必须大于0 / must be positive"));
        }
        Ok(())
    }

    /// 由配置构造筛选器（RMS 在前，dBFS 在后）
    pub fn build_selector(&self) -> AudioResult<AudioSelector> {
        let mut selector = AudioSelector::new();
        if let Some((low, high)) = self.rms {
            selector.add_filter_rms(low as f64, high as f64)?;
        }
        if let Some((low, high)) = self.dbfs {
            selector.add_filter_dbfs(low, high)?;
        }
        Ok(selector)
    }

    /// 输出详细程度
    pub fn verbosity(&self) -> Verbosity {
        if self.show_format {
            Verbosity::Format
        } else if self.show_value {
            Verbosity::Values
        } else {
            Verbosity::Path
        }
    }

    /// 并行模式参数（串行时为 None）
    pub fn parallel_options(&self) -> Option<ParallelOptions> {
        self.parallel_files.map(|degree| ParallelOptions {
            degree,
            timeout: Duration::from_secs(
                self.timeout_secs.unwrap_or(defaults::DECODE_TIMEOUT_SECS),
            ),
            sort_output: self.sort_output,
        })
    }

    /// 是否从标准输入读取路径
    #[inline]
    pub fn reads_stdin(&self) -> bool {
        self.files.is_empty()
    }
}

/// 构建命令行定义
pub fn build_command() -> Command {
    Command::new("audioselect")
        .version(VERSION)
        .about(
            "音频文件筛选器：分析音频文件并输出满足响度条件的文件（仅支持响度）\n\
             An audio file selector that analyzes files and prints those that meet the requirement. Only supports loudness.",
        )
        .author("MacinMeter Team")
        .arg(
            Arg::new("files")
                .help("一个或多个音频文件或包含音频文件的目录；省略时从标准输入逐行读取 / One or more audio files or directories containing audio files")
                .num_args(0..)
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("show-value")
                .long("show-value")
                .help("在每个选中条目后显示测量值 / Display all measured values after each selected entry")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("show-format")
                .long("show-format")
                .help("同时显示帧率、声道数、采样宽度和时长 / Also display frame rate, channels, sample width and duration")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .help("输出不满足条件的音频文件 / Print audio files that don't meet the requirement")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rms")
                .long("rms")
                .help("RMS 取值范围（闭区间）/ Range of RMS value")
                .num_args(2)
                .value_names(["LOW", "HIGH"])
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("dbfs")
                .long("dbfs")
                .help("dBFS 取值范围（闭区间）/ Range of dBFS value")
                .num_args(2)
                .value_names(["LOW", "HIGH"])
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("parallel-files")
                .long("parallel-files")
                .short('j')
                .help("并行处理的文件数（默认串行）/ Number of files decoded concurrently (default: serial)")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("sort")
                .long("sort")
                .help("并行模式下按路径排序输出 / Sort output by path in parallel mode")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("并行模式下单文件解码超时秒数（默认120）/ Per-file decode timeout in seconds in parallel mode")
                .value_name("SECS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("在标准错误输出详细诊断信息 / Print diagnostics to stderr")
                .action(ArgAction::SetTrue),
        )
}

/// 读取成对的区间参数
fn range_pair<T: Copy + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<(T, T)> {
    let values: Vec<T> = matches.get_many::<T>(id)?.copied().collect();
    match values.as_slice() {
        [low, high] => Some((*low, *high)),
        _ => None,
    }
}

/// 由解析结果构造配置
fn config_from_matches(matches: &ArgMatches) -> AppConfig {
    AppConfig {
        files: matches
            .get_many::<PathBuf>("files")
            .map(|paths| paths.map(|p| trim_path(p)).collect())
            .unwrap_or_default(),
        show_value: matches.get_flag("show-value"),
        show_format: matches.get_flag("show-format"),
        exclude: matches.get_flag("exclude"),
        rms: range_pair::<i64>(matches, "rms"),
        dbfs: range_pair::<f64>(matches, "dbfs"),
        parallel_files: matches.get_one::<usize>("parallel-files").copied(),
        sort_output: matches.get_flag("sort"),
        timeout_secs: matches.get_one::<u64>("timeout").copied(),
        verbose: matches.get_flag("verbose"),
    }
}

/// 从给定参数解析配置（便于测试）
pub fn try_parse_from<I, T>(args: I) -> Result<AppConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    build_command()
        .try_get_matches_from(args)
        .map(|matches| config_from_matches(&matches))
}

/// 解析命令行参数并创建配置（用法错误由clap打印并退出）
pub fn parse_args() -> AppConfig {
    config_from_matches(&build_command().get_matches())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = try_parse_from(["audioselect"]).unwrap();
        assert!(config.reads_stdin());
        assert!(!config.show_value);
        assert!(!config.exclude);
        assert_eq!(config.rms, None);
        assert_eq!(config.dbfs, None);
        assert_eq!(config.verbosity(), Verbosity::Path);
        assert!(config.parallel_options().is_none());
        assert!(config.build_selector().unwrap().is_empty());
    }

    #[test]
    fn test_ranges_and_switches() {
        let config = try_parse_from([
            "audioselect",
            "--rms",
            "100",
            "1000",
            "--dbfs",
            "-40.5",
            "-3",
            "--exclude",
            "--show-value",
            "/music",
            "song.mp3",
        ])
        .unwrap();

        assert_eq!(config.rms, Some((100, 1000)));
        assert_eq!(config.dbfs, Some((-40.5, -3.0)));
        assert!(config.exclude);
        assert_eq!(config.verbosity(), Verbosity::Values);
        assert_eq!(
            config.files,
            vec![PathBuf::from("/music"), PathBuf::from("song.mp3")]
        );
        assert_eq!(config.build_selector().unwrap().len(), 2);
    }

    #[test]
    fn test_positional_paths_are_trimmed() {
        let config = try_parse_from(["audioselect", " /music ", "song.mp3\n"]).unwrap();
        assert_eq!(
            config.files,
            vec![PathBuf::from("/music"), PathBuf::from("song.mp3")]
        );
        assert!(!config.reads_stdin());
    }

    #[test]
    fn test_rms_requires_integers() {
        assert!(try_parse_from(["audioselect", "--rms", "1.5", "10"]).is_err());
        assert!(try_parse_from(["audioselect", "--rms", "10"]).is_err());
    }

    #[test]
    fn test_inverted_range_is_config_error() {
        let config = try_parse_from(["audioselect", "--dbfs", "-3", "-40"]).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.build_selector().is_err());
    }

    #[test]
    fn test_parallel_options() {
        let config =
            try_parse_from(["audioselect", "-j", "4", "--sort", "--timeout", "30", "."]).unwrap();
        assert!(config.validate().is_ok());
        let options = config.parallel_options().unwrap();
        assert_eq!(options.degree, 4);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert!(options.sort_output);

        let config = try_parse_from(["audioselect", "-j", "2"]).unwrap();
        assert_eq!(
            config.parallel_options().unwrap().timeout,
            Duration::from_secs(defaults::DECODE_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_parallel_only_flags_rejected_in_serial_mode() {
        let config = try_parse_from(["audioselect", "--sort"]).unwrap();
        assert!(config.validate().is_err());
        let config = try_parse_from(["audioselect", "--timeout", "5"]).unwrap();
        assert!(config.validate().is_err());
        let config = try_parse_from(["audioselect", "-j", "0"]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_show_format_implies_values() {
        let config = try_parse_from(["audioselect", "--show-format"]).unwrap();
        assert_eq!(config.verbosity(), Verbosity::Format);
    }
}
