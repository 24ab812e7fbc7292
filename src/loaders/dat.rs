//! # `.dat` 摘要文件
//!
//! 摘要文件列出一组 TIFF 图像及每幅图像的参数。
//!
//! ## 格式说明
//! ```text
//! ; 注释（分号之后到行尾）
//! ; 文件名  phi  [monitor]  [exposure time]
//! Aus-00001.tif -90
//! Aus-00002.tif -85  1200  10.0
//! ```
//! 相对路径相对于摘要文件所在目录解析。
//!
//! ## 依赖关系
//! - 被 `loaders/mod.rs` 使用
//! - 使用 `loaders/tiff.rs`

use crate::data::Datafile;
use crate::error::{DfredError, Result};
use crate::loaders::tiff::read_tiff_file;
use crate::loaders::LoadOptions;
use crate::models::{keys, Measurement};
use std::fs;
use std::path::Path;

/// 摘要中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct DatEntry {
    pub file: String,
    pub phi: f64,
    pub monitor: f64,
    pub time: f64,
    /// 行号（从 1 开始）
    pub line: usize,
}

fn dat_error(name: &str, line: usize, reason: &str) -> DfredError {
    DfredError::ParseError {
        format: "dat".to_string(),
        path: name.to_string(),
        reason: format!("line {}: {}", line, reason),
    }
}

/// 解析摘要内容
pub fn parse_dat_content(content: &str, name: &str) -> Result<Vec<DatEntry>> {
    let mut entries = Vec::new();

    for (i, raw) in content.lines().enumerate() {
        let line = i + 1;
        let text = raw.split(';').next().unwrap_or("");
        let parts: Vec<&str> = text.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 2 || parts.len() > 4 {
            return Err(dat_error(name, line, "expected 'file phi [monitor] [time]'"));
        }

        let number = |idx: usize, what: &str| -> Result<f64> {
            match parts.get(idx) {
                None => Ok(0.0),
                Some(s) => s
                    .parse()
                    .map_err(|_| dat_error(name, line, &format!("bad {} value '{}'", what, s))),
            }
        };

        entries.push(DatEntry {
            file: parts[0].to_string(),
            phi: number(1, "phi")?,
            monitor: number(2, "monitor")?,
            time: number(3, "exposure time")?,
            line,
        });
    }

    if entries.is_empty() {
        return Err(DfredError::NoData(format!("no images listed in {}", name)));
    }
    Ok(entries)
}

/// 读取摘要文件及其列出的全部图像
pub fn load_dat_file(path: &Path, options: &LoadOptions) -> Result<Datafile> {
    let content = fs::read_to_string(path).map_err(|e| DfredError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let name = path.display().to_string();
    let entries = parse_dat_content(&content, &name)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut measurements = Vec::with_capacity(entries.len());
    for entry in &entries {
        let tiff = read_tiff_file(&dir.join(&entry.file)).map_err(|e| DfredError::ParseError {
            format: "dat".to_string(),
            path: name.clone(),
            reason: format!("line {}: cannot load image '{}': {}", entry.line, entry.file, e),
        })?;

        let mut metadata = tiff
            .metadata
            .with(keys::PHI, entry.phi)
            .with(keys::MONITOR, entry.monitor)
            .with(keys::TIME, entry.time);
        if let Some(tth) = options.default_tth {
            if metadata.real(keys::TTH).is_none() {
                metadata = metadata.with(keys::TTH, tth);
            }
        }
        measurements.push(Measurement::new(metadata, tiff.image));
    }

    log::info!("loaded {} images from {}", measurements.len(), name);
    Datafile::new(
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown"),
        measurements,
    )
}
