//! # 测量序列
//!
//! 借用自所属文件的一段连续测量（至少一个）。构造时计算平均元数据；
//! 所有成员图像尺寸必须一致，违反是调用方的编程错误，直接 panic。
//!
//! ## 依赖关系
//! - 被 `data/cluster.rs`, `data/corrset.rs`, `calc/dfgram.rs` 使用
//! - 使用 `models/`, `pars/params.rs`

use crate::models::{Image, Measurement, Metadata, Range, Size2d};
use crate::pars::NormMode;

/// 测量序列
#[derive(Debug, Clone)]
pub struct Sequence<'a> {
    members: &'a [Measurement],
    metadata: Metadata,
}

impl<'a> Sequence<'a> {
    /// # Panics
    /// 序列为空或成员图像尺寸不一致
    pub fn new(members: &'a [Measurement]) -> Self {
        assert!(!members.is_empty(), "a sequence needs at least one measurement");
        let size = members[0].image_size();
        assert!(
            members.iter().all(|m| m.image_size() == size),
            "all measurements of a sequence must share one image size"
        );
        let metadata = Metadata::average(members.iter().map(|m| m.metadata()));
        Self { members, metadata }
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &'a [Measurement] {
        self.members
    }

    pub fn at(&self, i: usize) -> &'a Measurement {
        &self.members[i]
    }

    pub fn image_size(&self) -> Size2d {
        self.members[0].image_size()
    }

    /// 平均元数据
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn omg(&self) -> f64 {
        self.metadata.omg()
    }

    pub fn phi(&self) -> f64 {
        self.metadata.phi()
    }

    pub fn chi(&self) -> f64 {
        self.metadata.chi()
    }

    pub fn tth(&self) -> f64 {
        self.metadata.tth()
    }

    pub fn monitor_count(&self) -> f64 {
        self.metadata.monitor_count()
    }

    pub fn time(&self) -> f64 {
        self.metadata.time()
    }

    /// 所有成员的强度范围
    pub fn range_inten(&self) -> Range {
        self.members
            .iter()
            .map(|m| m.range_inten())
            .fold(Range::empty(), |acc, r| acc.union(&r))
    }

    /// 归一化模式对应的分母（合并后的量）；`None` 模式为 1
    pub fn norm_value(&self, mode: NormMode) -> f64 {
        match mode {
            NormMode::None => 1.0,
            NormMode::Monitor => self.metadata.monitor_count(),
            NormMode::DeltaMonitor => self.metadata.delta_monitor_count(),
            NormMode::Time => self.metadata.time(),
            NormMode::DeltaTime => self.metadata.delta_time(),
        }
    }

    /// 逐像素求和的图像
    pub fn summed_image(&self) -> Image {
        let mut sum = self.members[0].image().clone();
        for m in &self.members[1..] {
            sum.add_assign(m.image());
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::keys;

    fn meas(value: f64, mon: f64) -> Measurement {
        Measurement::new(
            Metadata::new()
                .with(keys::MONITOR, mon)
                .with(keys::TIME, 1.0)
                .with(keys::TTH, 40.0 + value),
            Image::filled(Size2d::new(2, 2), value),
        )
    }

    #[test]
    fn test_sequence_average_and_norm() {
        let ms = vec![meas(1.0, 100.0), meas(3.0, 200.0)];
        let seq = Sequence::new(&ms);
        assert_eq!(seq.count(), 2);
        assert!((seq.tth() - 42.0).abs() < 1e-12);
        assert!((seq.norm_value(NormMode::Monitor) - 300.0).abs() < 1e-12);
        assert!((seq.norm_value(NormMode::DeltaMonitor) - 100.0).abs() < 1e-12);
        assert!((seq.norm_value(NormMode::Time) - 2.0).abs() < 1e-12);
        assert_eq!(seq.norm_value(NormMode::DeltaTime), 0.0);
        assert_eq!(seq.norm_value(NormMode::None), 1.0);
    }

    #[test]
    fn test_sequence_ranges_and_sum() {
        let ms = vec![meas(1.0, 1.0), meas(3.0, 1.0)];
        let seq = Sequence::new(&ms);
        assert_eq!(seq.range_inten(), Range::new(1.0, 3.0));
        assert_eq!(seq.summed_image().intens(), &[4.0; 4]);
    }

    #[test]
    #[should_panic(expected = "one image size")]
    fn test_sequence_size_mismatch_panics() {
        let ms = vec![
            meas(1.0, 1.0),
            Measurement::new(Metadata::new(), Image::filled(Size2d::new(3, 2), 0.0)),
        ];
        Sequence::new(&ms);
    }

    #[test]
    #[should_panic]
    fn test_empty_sequence_panics() {
        Sequence::new(&[]);
    }
}
