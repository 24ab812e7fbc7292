//! # 数据文件与数据集
//!
//! `Datafile` 独占持有一个文件的全部测量；`Dataset` 持有所有文件、
//! 分组因子以及由它们划分出的全部 Cluster。增删文件或改变分组因子时
//! 对所有文件重新分组。
//!
//! ## 依赖关系
//! - 被 `session.rs`, `loaders/` 使用
//! - 使用 `data/cluster.rs`

use crate::data::cluster::{partition, Cluster};
use crate::data::Sequence;
use crate::error::{DfredError, Result};
use crate::models::{Measurement, Size2d};

/// 一个数据文件
#[derive(Debug, Clone)]
pub struct Datafile {
    name: String,
    measurements: Vec<Measurement>,
}

impl Datafile {
    /// 至少一个测量，且所有图像尺寸一致
    pub fn new(name: impl Into<String>, measurements: Vec<Measurement>) -> Result<Self> {
        let name = name.into();
        let Some(first) = measurements.first() else {
            return Err(DfredError::NoData(format!("file '{}' has no measurements", name)));
        };
        let size = first.image_size();
        if let Some(bad) = measurements.iter().find(|m| m.image_size() != size) {
            return Err(DfredError::ImageSizeMismatch {
                expected: size.to_string(),
                found: bad.image_size().to_string(),
            });
        }
        Ok(Self { name, measurements })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn count(&self) -> usize {
        self.measurements.len()
    }

    pub fn image_size(&self) -> Size2d {
        self.measurements[0].image_size()
    }
}

/// 全部已加载的文件及其 Cluster
#[derive(Debug, Clone)]
pub struct Dataset {
    files: Vec<Datafile>,
    binning_factor: usize,
    clusters: Vec<Cluster>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            binning_factor: 1,
            clusters: Vec::new(),
        }
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// 公共图像尺寸；无文件时为 None
    pub fn image_size(&self) -> Option<Size2d> {
        self.files.first().map(|f| f.image_size())
    }

    /// 加入文件，图像尺寸必须与已有文件一致
    pub fn add_file(&mut self, file: Datafile) -> Result<()> {
        if let Some(size) = self.image_size() {
            if file.image_size() != size {
                return Err(DfredError::ImageSizeMismatch {
                    expected: size.to_string(),
                    found: file.image_size().to_string(),
                });
            }
        }
        self.files.push(file);
        self.repartition();
        Ok(())
    }

    pub fn remove_file(&mut self, index: usize) -> Result<Datafile> {
        if index >= self.files.len() {
            return Err(DfredError::InvalidArgument(format!(
                "no file with index {} ({} loaded)",
                index,
                self.files.len()
            )));
        }
        let file = self.files.remove(index);
        self.repartition();
        Ok(file)
    }

    pub fn files(&self) -> &[Datafile] {
        &self.files
    }

    pub fn file(&self, index: usize) -> &Datafile {
        &self.files[index]
    }

    pub fn binning_factor(&self) -> usize {
        self.binning_factor
    }

    pub fn set_binning_factor(&mut self, factor: usize) -> Result<()> {
        if factor == 0 {
            return Err(DfredError::InvalidArgument(
                "binning factor must be at least 1".to_string(),
            ));
        }
        if factor != self.binning_factor {
            self.binning_factor = factor;
            self.repartition();
        }
        Ok(())
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster(&self, index: usize) -> Option<&Cluster> {
        self.clusters.get(index)
    }

    pub fn set_cluster_selected(&mut self, index: usize, selected: bool) -> Result<()> {
        let count = self.clusters.len();
        let cluster = self.clusters.get_mut(index).ok_or_else(|| {
            DfredError::InvalidArgument(format!("no cluster with index {} ({} total)", index, count))
        })?;
        cluster.set_selected(selected);
        Ok(())
    }

    /// 参与分析的 Cluster：已选中，且在 `drop_incomplete` 时排除不完整的
    pub fn active_clusters(&self, drop_incomplete: bool) -> impl Iterator<Item = &Cluster> {
        self.clusters
            .iter()
            .filter(move |c| c.is_selected() && !(drop_incomplete && c.is_incomplete()))
    }

    /// Cluster 的成员序列
    pub fn sequence(&self, cluster: &Cluster) -> Sequence<'_> {
        cluster.sequence(self)
    }

    pub fn measurement_count(&self) -> usize {
        self.files.iter().map(|f| f.count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 所有文件重新分组，选择状态重置
    fn repartition(&mut self) {
        let mut clusters = Vec::new();
        for (i, file) in self.files.iter().enumerate() {
            clusters.extend(partition(
                i,
                clusters.len(),
                file.measurements(),
                self.binning_factor,
            ));
        }
        log::debug!(
            "partitioned {} measurements into {} clusters (binning {})",
            self.measurement_count(),
            clusters.len(),
            self.binning_factor
        );
        self.clusters = clusters;
    }
}
