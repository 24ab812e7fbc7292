//! # 数据模型模块
//!
//! 定义元数据、图像、测量、区间与曲线等基础数据类型。
//!
//! ## 依赖关系
//! - 被 `data/`, `calc/`, `fit/`, `loaders/` 使用
//! - 子模块: metadata, image, measurement, range, curve

pub mod curve;
pub mod image;
pub mod measurement;
pub mod metadata;
pub mod range;

pub use curve::Curve;
pub use image::{Image, Size2d};
pub use measurement::Measurement;
pub use metadata::{keys, MetaValue, Metadata};
pub use range::{Range, Ranges};
