//! audioselect - 主程序入口
//!
//! 纯流程控制器：解析参数、构造筛选器、驱动求值器并把结果交给输出器。

use audioselect::{
    AudioError, EvaluationSummary, TreeEvaluator, UniversalDecoder,
    error::ErrorCategory,
    tools::{self, AppConfig, Reporter, constants::exit_codes},
};
use std::io::{self, Write};
use std::process;

/// 获取错误建议文本
fn get_error_suggestion(error: &AudioError) -> &'static str {
    match ErrorCategory::from_audio_error(error) {
        ErrorCategory::Config => {
            "检查命令行参数是否正确，使用 --help 查看完整用法 / Check if command-line arguments are correct, use --help to see full usage"
        }
        ErrorCategory::Io => "检查输出流是否可写 / Check that the output stream is writable",
        ErrorCategory::Decoding | ErrorCategory::Other => {
            "请检查系统资源后重试，或降低并发度 / Check system resources and retry, or reduce --parallel-files"
        }
    }
}

/// 错误处理和建议
fn handle_error(error: AudioError) -> ! {
    // 下游管道关闭（如 `| head`）属于正常结束
    if let AudioError::IoError(ref e) = error
        && e.kind() == io::ErrorKind::BrokenPipe
    {
        process::exit(exit_codes::SUCCESS);
    }

    let category = ErrorCategory::from_audio_error(&error);
    eprintln!("[ERROR] {}: {error}", category.display_name());
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    let exit_code = match category {
        ErrorCategory::Config => exit_codes::CONFIG_ERROR,
        _ => exit_codes::GENERAL_ERROR,
    };
    process::exit(exit_code);
}

/// 初始化日志：默认只输出警告，--verbose 提升到 debug，RUST_LOG 优先
fn init_logging(config: &AppConfig) {
    let default_level = if config.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// 应用程序主逻辑（便于测试和复用）
fn run() -> Result<EvaluationSummary, AudioError> {
    // 1. 解析命令行参数
    let config = tools::parse_args();
    init_logging(&config);

    // 2. 配置校验：任何配置错误都在遍历开始前报告
    config.validate()?;
    let selector = config.build_selector()?;
    if selector.is_empty() {
        log::debug!(
            "未指定筛选条件，选中所有可解码文件 / no ranges given, selecting every decodable file"
        );
    }
    for description in selector.describe() {
        log::debug!("筛选条件 / filter: {description}");
    }

    // 3. 构造求值器与输出器
    let evaluator = TreeEvaluator::new(UniversalDecoder::new());
    let stdout = io::stdout();
    let mut reporter = Reporter::new(stdout.lock(), config.verbosity(), config.exclude);
    let mut on_result = |result: &audioselect::EvaluationResult| {
        reporter.report_result(result).map_err(AudioError::from)
    };

    // 4. 串行流式或并行求值
    let summary = match config.parallel_options() {
        None if config.reads_stdin() => {
            evaluator.evaluate(tools::stdin_paths(), &selector, &mut on_result)?
        }
        None => evaluator.evaluate(&config.files, &selector, &mut on_result)?,
        Some(options) => {
            let roots = if config.reads_stdin() {
                tools::stdin_paths().collect()
            } else {
                config.files.clone()
            };
            evaluator.evaluate_parallel(roots, &selector, &options, &mut on_result)?
        }
    };

    reporter.flush()?;
    log::debug!(
        "完成 / done: {} 个候选文件, {} 个已求值, {} 个跳过, {} 行输出 / candidates, evaluated, skipped, lines",
        summary.candidates,
        summary.evaluated,
        summary.skipped,
        reporter.reported()
    );
    Ok(summary)
}

fn main() {
    match run() {
        Ok(_) => {
            let _ = io::stdout().flush();
        }
        Err(error) => handle_error(error),
    }
}
