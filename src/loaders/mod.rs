//! # 数据加载模块
//!
//! 把文件读成 `Datafile`。支持 `.dat` 摘要与单幅 TIFF。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 子模块: dat, tiff

pub mod dat;
pub mod tiff;

use crate::data::Datafile;
use crate::error::{DfredError, Result};
use crate::models::{keys, Measurement};
use std::path::Path;

/// 加载选项
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// 元数据中没有 2θ 时使用的探测器臂角
    pub default_tth: Option<f64>,
}

/// 按扩展名选择加载方式
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Datafile> {
    if !path.exists() {
        return Err(DfredError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "dat" => dat::load_dat_file(path, options),
        "tif" | "tiff" => {
            let t = tiff::read_tiff_file(path)?;
            let mut metadata = t.metadata;
            if let Some(tth) = options.default_tth {
                metadata = metadata.with(keys::TTH, tth);
            }
            Datafile::new(
                path.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown"),
                vec![Measurement::new(metadata, t.image)],
            )
        }
        _ => Err(DfredError::UnsupportedFormat(format!(
            "Cannot determine format for: {}",
            path.display()
        ))),
    }
}
