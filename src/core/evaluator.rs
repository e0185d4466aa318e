//! 树形求值器
//!
//! 遍历文件或目录树，对扩展名可识别的音频文件解码、求值筛选器并立即回调。
//! 结果逐个流式交付，不做聚合，任意规模的目录树内存占用都不随文件数增长
//! （去重集合除外）。
//!
//! 失败处理约定：路径不存在、目录不可读、解码失败、解码超时都只记录日志并跳过，
//! 绝不中断整批任务；唯一会中断遍历的是回调自身返回的错误（如输出管道关闭）。

use super::measurement::Measurements;
use super::selector::AudioSelector;
use crate::audio::AudioDecoder;
use crate::error::{AudioError, AudioResult};
use crate::tools::constants::RECOGNIZED_EXTENSIONS;
use crate::tools::utils;
use crossbeam_channel::RecvTimeoutError;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use walkdir::WalkDir;

/// 单个文件的求值结果（瞬时对象，交给回调后即丢弃）
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub path: PathBuf,
    pub selected: bool,
    pub measurements: Measurements,
}

/// 一次运行的计数统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
    /// 扩展名可识别的候选文件数
    pub candidates: usize,
    /// 成功解码并交给回调的文件数
    pub evaluated: usize,
    /// 解码失败/超时被跳过的文件数
    pub skipped: usize,
}

/// 并行模式参数
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelOptions {
    /// 工作线程数（会被限制在合法范围内）
    pub degree: usize,
    /// 单文件解码超时，超时按解码失败处理
    pub timeout: Duration,
    /// 缓冲全部结果并按路径排序后再输出
    pub sort_output: bool,
}

/// 返回可识别音频文件的格式提示（去掉前导点的扩展名，区分大小写）
pub fn audio_hint(path: &Path) -> Option<&str> {
    let ext = path.extension()?.to_str()?;
    RECOGNIZED_EXTENSIONS.contains(&ext).then_some(ext)
}

/// 展开单个根路径下的候选音频文件
///
/// 目录不跟随符号链接（与常规目录遍历一致，不会因链接成环而死循环），
/// 指向普通文件的符号链接按文件处理。
fn audio_candidates(root: &Path) -> Box<dyn Iterator<Item = PathBuf> + Send> {
    let metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) => {
            log::warn!("路径不存在或不可读，已跳过 / skipping {}: {e}", root.display());
            return Box::new(std::iter::empty());
        }
    };

    if metadata.is_file() {
        return if audio_hint(root).is_some() {
            Box::new(std::iter::once(root.to_path_buf()))
        } else {
            Box::new(std::iter::empty())
        };
    }

    if !metadata.is_dir() {
        log::debug!("非普通文件或目录，已忽略 / ignoring {}", root.display());
        return Box::new(std::iter::empty());
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("目录遍历出错，已跳过 / walk error: {e}");
                None
            }
        })
        .filter(|entry| {
            let file_type = entry.file_type();
            file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
        })
        .map(walkdir::DirEntry::into_path)
        .filter(|path| audio_hint(path).is_some());

    Box::new(walker)
}

/// 去重键：优先使用规范化路径，使重叠的根目录不会重复求值
fn dedup_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// 多个根路径的候选文件流（每个文件至多出现一次）
fn candidates<I, P>(roots: I) -> impl Iterator<Item = PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut seen = HashSet::new();
    roots
        .into_iter()
        .flat_map(|root| audio_candidates(root.as_ref()))
        .filter(move |path| seen.insert(dedup_key(path)))
}

/// 树形求值器
pub struct TreeEvaluator<D> {
    decoder: Arc<D>,
}

impl<D: AudioDecoder + 'static> TreeEvaluator<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder: Arc::new(decoder),
        }
    }

    /// 求值单个文件；扩展名不可识别或解码失败时返回 `None`
    pub fn evaluate_file(&self, path: &Path, selector: &AudioSelector) -> Option<EvaluationResult> {
        let hint = audio_hint(path)?;
        self.finish(path, selector, self.decoder.decode(path, hint))
    }

    fn finish(
        &self,
        path: &Path,
        selector: &AudioSelector,
        decoded: AudioResult<Measurements>,
    ) -> Option<EvaluationResult> {
        match decoded {
            Ok(measurements) => {
                log::debug!(
                    "{}: rms={} dbfs={:.2} {}Hz {}ch {}bit {}",
                    path.display(),
                    measurements.rms,
                    measurements.dbfs,
                    measurements.format.sample_rate,
                    measurements.format.channels,
                    measurements.format.bits_per_sample,
                    utils::fmt_hms(measurements.format.duration_millis())
                );
                Some(EvaluationResult {
                    path: path.to_path_buf(),
                    selected: selector.selects(&measurements),
                    measurements,
                })
            }
            Err(e) => {
                log::debug!("无法解码，已跳过 / skipping {}: {e}", path.display());
                None
            }
        }
    }

    /// 串行流式求值：每个文件完成后立即回调
    ///
    /// 回调返回错误时停止遍历并向上传播该错误。
    pub fn evaluate<I, P, F>(
        &self,
        roots: I,
        selector: &AudioSelector,
        mut on_result: F,
    ) -> AudioResult<EvaluationSummary>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
        F: FnMut(&EvaluationResult) -> AudioResult<()>,
    {
        let mut summary = EvaluationSummary::default();

        for path in candidates(roots) {
            summary.candidates += 1;
            match self.evaluate_file(&path, selector) {
                Some(result) => {
                    summary.evaluated += 1;
                    on_result(&result)?;
                }
                None => summary.skipped += 1,
            }
        }

        Ok(summary)
    }

    /// 带超时的单文件解码（解码在独立线程中进行，超时后该线程被放弃）
    fn decode_with_timeout(
        &self,
        path: &Path,
        hint: &str,
        timeout: Duration,
    ) -> AudioResult<Measurements> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let decoder = Arc::clone(&self.decoder);
        let owned_path = path.to_path_buf();
        let owned_hint = hint.to_string();

        std::thread::Builder::new()
            .name("decode-watchdog".to_string())
            .spawn(move || {
                let _ = tx.send(decoder.decode(&owned_path, &owned_hint));
            })
            .map_err(|e| {
                AudioError::ResourceError(format!("解码线程创建失败 / spawn failed: {e}"))
            })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(AudioError::Timeout(format!(
                "{} ({}s)",
                path.display(),
                timeout.as_secs_f64()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(AudioError::DecodingError(
                "解码线程异常退出 / decoder thread exited without a result".to_string(),
            )),
        }
    }

    /// 并行求值
    ///
    /// - rayon线程池执行解码与筛选，线程数受 `ParallelOptions::degree` 控制
    /// - 所有结果经 crossbeam 通道汇聚到调用线程，由调用线程单独执行回调（单写者）
    /// - 默认不保证输出顺序；`sort_output` 时缓冲全部结果并按路径排序
    pub fn evaluate_parallel<F>(
        &self,
        roots: Vec<PathBuf>,
        selector: &AudioSelector,
        options: &ParallelOptions,
        mut on_result: F,
    ) -> AudioResult<EvaluationSummary>
    where
        F: FnMut(&EvaluationResult) -> AudioResult<()>,
    {
        let degree = utils::effective_parallel_degree(options.degree);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(degree)
            .thread_name(|i| format!("select-worker-{i}"))
            .build()
            .map_err(|e| AudioError::ResourceError(format!("线程池创建失败 / thread pool: {e}")))?;

        log::debug!("启用多文件并行处理 / parallel evaluation with {degree} workers");

        let (tx, rx) = crossbeam_channel::bounded::<Option<EvaluationResult>>(degree * 4);
        let cancelled = AtomicBool::new(false);
        let timeout = options.timeout;

        std::thread::scope(|scope| -> AudioResult<EvaluationSummary> {
            let cancelled = &cancelled;
            scope.spawn(move || {
                pool.install(|| {
                    candidates(roots).par_bridge().for_each_with(tx, |tx, path| {
                        if cancelled.load(Ordering::Relaxed) {
                            return;
                        }
                        let outcome = audio_hint(&path).and_then(|hint| {
                            let decoded = self.decode_with_timeout(&path, hint, timeout);
                            self.finish(&path, selector, decoded)
                        });
                        // 接收端已关闭说明调用方已停止，丢弃即可
                        let _ = tx.send(outcome);
                    });
                });
            });

            let mut summary = EvaluationSummary::default();
            let mut buffered = Vec::new();
            let mut outcome = Ok(());

            for received in rx.iter() {
                summary.candidates += 1;
                let Some(result) = received else {
                    summary.skipped += 1;
                    continue;
                };
                summary.evaluated += 1;

                if options.sort_output {
                    buffered.push(result);
                } else if let Err(e) = on_result(&result) {
                    outcome = Err(e);
                    cancelled.store(true, Ordering::Relaxed);
                    break;
                }
            }
            drop(rx);

            outcome?;

            buffered.sort_by(|a, b| a.path.cmp(&b.path));
            for result in &buffered {
                on_result(result)?;
            }
            Ok(summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_hint_is_case_sensitive() {
        assert_eq!(audio_hint(Path::new("/music/a.mp3")), Some("mp3"));
        assert_eq!(audio_hint(Path::new("b.wma")), Some("wma"));
        assert_eq!(audio_hint(Path::new("c.m4a")), Some("m4a"));
        assert_eq!(audio_hint(Path::new("d.MP3")), None);
        assert_eq!(audio_hint(Path::new("e.flac")), None);
        assert_eq!(audio_hint(Path::new("notes.txt")), None);
        assert_eq!(audio_hint(Path::new("no_extension")), None);
        // 隐藏文件没有扩展名
        assert_eq!(audio_hint(Path::new(".mp3")), None);
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let missing = std::env::temp_dir().join("audioselect-definitely-missing-root");
        assert_eq!(audio_candidates(&missing).count(), 0);
    }

    #[test]
    fn test_duplicate_roots_visited_once() {
        let dir = std::env::temp_dir().join(format!("audioselect-dedup-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("one.wav");
        std::fs::write(&file, b"x").unwrap();

        let found: Vec<PathBuf> = candidates([dir.clone(), dir.clone(), file]).collect();
        assert_eq!(found.len(), 1);
    }
}
