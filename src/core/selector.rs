//! 筛选器模块
//!
//! `RangePredicate` 对单个测量量做闭区间判断；`AudioSelector` 把多个谓词按注册顺序
//! 做逻辑与（AND），遇到第一个 `false` 即短路返回。
//!
//! 空筛选器选中一切输入（空合取为真）。

use super::measurement::{MeasurementKind, Measurements};
use crate::error::{AudioResult, invalid_input};
use crate::tools::utils::format_range;
use std::fmt;

/// RMS 默认下界（用户未指定时）
pub const RMS_DEFAULT_LOW: f64 = 0.0;
/// RMS 默认上界（无上界）
pub const RMS_DEFAULT_HIGH: f64 = f64::INFINITY;
/// dBFS 默认下界（无下界）
pub const DBFS_DEFAULT_LOW: f64 = f64::NEG_INFINITY;
/// dBFS 默认上界（满幅）
pub const DBFS_DEFAULT_HIGH: f64 = 0.0;

/// 作用于一份测量快照的谓词
///
/// 求值必须是纯函数：同一快照重复求值结果一致，且不修改共享状态。
pub trait Predicate: Send + Sync {
    fn test(&self, audio: &Measurements) -> bool;

    /// 日志用的可读描述
    fn describe(&self) -> String {
        "custom predicate".to_string()
    }
}

impl<F> Predicate for F
where
    F: Fn(&Measurements) -> bool + Send + Sync,
{
    fn test(&self, audio: &Measurements) -> bool {
        self(audio)
    }
}

/// 单一测量量的闭区间谓词 `low ≤ v ≤ high`
///
/// 构造后不可变；`low > high` 或任一边界为 NaN 属于配置错误，在构造时拒绝。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangePredicate {
    kind: MeasurementKind,
    low: f64,
    high: f64,
}

impl RangePredicate {
    pub fn new(kind: MeasurementKind, low: f64, high: f64) -> AudioResult<Self> {
        if low.is_nan() || high.is_nan() {
            return Err(invalid_input(
                &format!("--{kind}"),
                "范围边界不能为NaN / range bound is NaN",
            ));
        }
        if low > high {
            return Err(invalid_input(
                &format!("--{kind}"),
                format!("下界大于上界 / lower bound {low} exceeds upper bound {high}"),
            ));
        }
        Ok(Self { kind, low, high })
    }

    /// 该测量量最宽的有效范围（RMS: [0, +∞)，dBFS: (-∞, 0]）
    pub fn full(kind: MeasurementKind) -> Self {
        let (low, high) = match kind {
            MeasurementKind::Rms => (RMS_DEFAULT_LOW, RMS_DEFAULT_HIGH),
            MeasurementKind::Dbfs => (DBFS_DEFAULT_LOW, DBFS_DEFAULT_HIGH),
        };
        Self { kind, low, high }
    }

    /// 纯数值比较，域外输入不报错
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }

    pub fn kind(&self) -> MeasurementKind {
        self.kind
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }
}

impl Predicate for RangePredicate {
    fn test(&self, audio: &Measurements) -> bool {
        self.contains(audio.value(self.kind))
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RangePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ∈ {}", self.kind, format_range(self.low, self.high))
    }
}

/// 组合筛选器：有序谓词集合的逻辑与
///
/// 添加谓词需要 `&mut self`，求值只需 `&self`；并行求值共享 `&AudioSelector`
/// 期间无法再添加谓词。
#[derive(Default)]
pub struct AudioSelector {
    predicates: Vec<Box<dyn Predicate>>,
}

impl AudioSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加任意谓词（求值顺序即注册顺序）
    pub fn push<P: Predicate + 'static>(&mut self, predicate: P) {
        self.predicates.push(Box::new(predicate));
    }

    /// 追加 RMS 范围谓词
    pub fn add_filter_rms(&mut self, low: f64, high: f64) -> AudioResult<()> {
        self.push(RangePredicate::new(MeasurementKind::Rms, low, high)?);
        Ok(())
    }

    /// 追加 dBFS 范围谓词
    pub fn add_filter_dbfs(&mut self, low: f64, high: f64) -> AudioResult<()> {
        self.push(RangePredicate::new(MeasurementKind::Dbfs, low, high)?);
        Ok(())
    }

    /// 所有谓词均为真时选中；遇到第一个假值短路
    pub fn selects(&self, audio: &Measurements) -> bool {
        self.predicates.iter().all(|p| p.test(audio))
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// 各谓词描述（按注册顺序）
    pub fn describe(&self) -> Vec<String> {
        self.predicates.iter().map(|p| p.describe()).collect()
    }
}

impl fmt::Debug for AudioSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSelector")
            .field("predicates", &self.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFormat;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn audio(rms: u64, dbfs: f64) -> Measurements {
        Measurements::new(rms, dbfs, AudioFormat::new(44100, 2, 16, 44100))
    }

    #[test]
    fn test_range_is_inclusive_on_both_ends() {
        let range = RangePredicate::new(MeasurementKind::Rms, 100.0, 1000.0).unwrap();
        assert!(range.contains(100.0));
        assert!(range.contains(1000.0));
        assert!(range.contains(500.0));
        assert!(!range.contains(99.999));
        assert!(!range.contains(1000.001));
    }

    #[test]
    fn test_range_matches_numeric_comparison() {
        let bounds = [(-60.0, -10.0), (-3.0, -3.0), (0.0, 0.0)];
        let values = [-100.0, -60.0, -30.0, -10.0, -3.0, 0.0, 5.0];
        for (lo, hi) in bounds {
            let range = RangePredicate::new(MeasurementKind::Dbfs, lo, hi).unwrap();
            for v in values {
                assert_eq!(range.contains(v), lo <= v && v <= hi, "[{lo}, {hi}] vs {v}");
            }
        }
    }

    #[test]
    fn test_inverted_bounds_rejected_at_construction() {
        let err = RangePredicate::new(MeasurementKind::Rms, 1000.0, 100.0).unwrap_err();
        assert!(err.to_string().contains("--rms"));
        assert!(RangePredicate::new(MeasurementKind::Dbfs, f64::NAN, 0.0).is_err());

        let mut selector = AudioSelector::new();
        assert!(selector.add_filter_dbfs(-1.0, -20.0).is_err());
        assert!(selector.is_empty(), "失败的范围不应被注册");
    }

    #[test]
    fn test_default_ranges() {
        let rms = RangePredicate::full(MeasurementKind::Rms);
        assert!(rms.contains(0.0));
        assert!(rms.contains(1e12));
        assert!(!rms.contains(-1.0));

        let dbfs = RangePredicate::full(MeasurementKind::Dbfs);
        assert!(dbfs.contains(f64::NEG_INFINITY));
        assert!(dbfs.contains(0.0));
        assert!(!dbfs.contains(0.5));
    }

    #[test]
    fn test_empty_selector_selects_everything() {
        let selector = AudioSelector::new();
        assert!(selector.selects(&audio(0, f64::NEG_INFINITY)));
        assert!(selector.selects(&audio(32767, 0.0)));
    }

    #[test]
    fn test_selector_is_conjunction() {
        let mut selector = AudioSelector::new();
        selector.add_filter_rms(100.0, 1000.0).unwrap();
        selector.add_filter_dbfs(-20.0, 0.0).unwrap();

        assert!(selector.selects(&audio(500, -10.0)));
        assert!(!selector.selects(&audio(50, -10.0)));
        assert!(!selector.selects(&audio(500, -40.0)));
        assert!(!selector.selects(&audio(50, -40.0)));
    }

    #[test]
    fn test_adding_predicate_only_shrinks_selection() {
        let inputs: Vec<Measurements> = (0..20)
            .map(|i| audio(i * 100, -(i as f64) * 3.0))
            .collect();

        let mut selector = AudioSelector::new();
        selector.add_filter_rms(300.0, 1500.0).unwrap();
        let before: Vec<bool> = inputs.iter().map(|a| selector.selects(a)).collect();

        selector.add_filter_dbfs(-30.0, -12.0).unwrap();
        let after: Vec<bool> = inputs.iter().map(|a| selector.selects(a)).collect();

        for (b, a) in before.iter().zip(&after) {
            assert!(!a || *b, "新增谓词不应扩大选中集合");
        }
        assert!(after.iter().filter(|x| **x).count() < before.iter().filter(|x| **x).count());
    }

    #[test]
    fn test_short_circuit_does_not_change_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut selector = AudioSelector::new();
        selector.add_filter_rms(1000.0, 2000.0).unwrap();
        selector.push(move |_: &Measurements| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        // 第一个谓词为假，第二个不会被求值
        assert!(!selector.selects(&audio(10, -50.0)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(selector.selects(&audio(1500, -5.0)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let mut selector = AudioSelector::new();
        selector.add_filter_dbfs(-12.0, -6.0).unwrap();
        let a = audio(8000, -8.5);
        assert_eq!(selector.selects(&a), selector.selects(&a));
    }

    #[test]
    fn test_display_and_describe() {
        let range = RangePredicate::new(MeasurementKind::Rms, 100.0, 1000.0).unwrap();
        assert_eq!(range.to_string(), "rms ∈ [100, 1000]");
        assert_eq!(
            RangePredicate::full(MeasurementKind::Dbfs).to_string(),
            "dbfs ∈ [-inf, 0]"
        );

        let mut selector = AudioSelector::new();
        selector.push(range);
        selector.push(|a: &Measurements| a.format.channels == 2);
        assert_eq!(
            selector.describe(),
            vec!["rms ∈ [100, 1000]".to_string(), "custom predicate".to_string()]
        );
    }
}
