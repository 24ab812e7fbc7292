//! # 数据组织模块
//!
//! 文件、数据集、测量序列、Cluster 分组与平场校正集。
//!
//! ## 依赖关系
//! - 被 `calc/`, `session.rs`, `loaders/` 使用
//! - 子模块: sequence, cluster, dataset, corrset

pub mod cluster;
pub mod corrset;
pub mod dataset;
pub mod sequence;

pub use cluster::{partition, Cluster};
pub use corrset::Corrset;
pub use dataset::{Datafile, Dataset};
pub use sequence::Sequence;
