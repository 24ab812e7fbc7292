//! # Cluster 分组
//!
//! 把一个文件的测量按位置顺序每 `binning_factor` 个分为一组；最后一组可能
//! 不满（incomplete），仍作为 Cluster 保留。Cluster 通过文件序号与偏移量
//! 引用所属文件中的测量，不持有测量数据。
//!
//! ## 依赖关系
//! - 被 `data/dataset.rs`, `session.rs` 使用
//! - 使用 `data/sequence.rs`

use crate::data::{Dataset, Sequence};
use crate::models::{Measurement, Metadata};

/// 一组连续测量构成的分析单元
#[derive(Debug, Clone)]
pub struct Cluster {
    /// 所属文件在数据集中的序号
    file_index: usize,
    /// 在全部 Cluster 中的序号
    index: usize,
    /// 第一个成员在文件中的偏移
    offset: usize,
    size: usize,
    incomplete: bool,
    selected: bool,
    /// 构造时计算的平均元数据
    metadata: Metadata,
}

impl Cluster {
    pub fn file_index(&self) -> usize {
        self.file_index
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// 成员数少于分组因子
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// 成员测量组成的序列
    pub fn sequence<'a>(&self, dataset: &'a Dataset) -> Sequence<'a> {
        let file = dataset.file(self.file_index);
        Sequence::new(&file.measurements()[self.offset..self.offset + self.size])
    }
}

/// 按位置分组；`first_index` 为第一个 Cluster 的全局序号
///
/// # Panics
/// `binning_factor` 为 0
pub fn partition(
    file_index: usize,
    first_index: usize,
    measurements: &[Measurement],
    binning_factor: usize,
) -> Vec<Cluster> {
    assert!(binning_factor >= 1, "binning factor must be at least 1");

    measurements
        .chunks(binning_factor)
        .enumerate()
        .map(|(i, chunk)| Cluster {
            file_index,
            index: first_index + i,
            offset: i * binning_factor,
            size: chunk.len(),
            incomplete: chunk.len() < binning_factor,
            selected: true,
            metadata: Sequence::new(chunk).metadata().clone(),
        })
        .collect()
}
