//! # 单次测量
//!
//! 一幅原始二维探测器图像及其元数据。由所属的 `Datafile` 独占持有；
//! 核心计算只通过借用访问。
//!
//! ## 依赖关系
//! - 被 `data/`, `loaders/` 使用
//! - 使用 `models/image.rs`, `models/metadata.rs`

use crate::models::{Image, Metadata, Range, Size2d};

/// 单次测量
#[derive(Debug, Clone)]
pub struct Measurement {
    metadata: Metadata,
    image: Image,
}

impl Measurement {
    pub fn new(metadata: Metadata, image: Image) -> Self {
        Self { metadata, image }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn image_size(&self) -> Size2d {
        self.image.size()
    }

    pub fn range_inten(&self) -> Range {
        self.image.range_inten()
    }
}
