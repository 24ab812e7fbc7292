//! # 衍射图导出
//!
//! ## 支持格式
//! - CSV: `2theta,intensity,background,intensity_minus_bg`
//! - XY: 注释头加两列（2θ, 扣除基线前的强度）
//!
//! ## 依赖关系
//! - 被 `commands/reduce.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::calc::Dfgram;
use crate::error::{DfredError, Result};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xy,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xy => "xy",
        }
    }
}

/// 按格式导出
pub fn write_dfgram(dfgram: &Dfgram, title: &str, format: ExportFormat, path: &Path) -> Result<()> {
    match format {
        ExportFormat::Csv => to_csv(dfgram, path),
        ExportFormat::Xy => to_xy(dfgram, title, path),
    }
}

/// 导出为 CSV
pub fn to_csv(dfgram: &Dfgram, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    wtr.write_record(["2theta", "intensity", "background", "intensity_minus_bg"])?;

    for ((x, y), (_, y_bg)) in dfgram.curve().points().zip(dfgram.curve_minus_bg().points()) {
        wtr.write_record(&[
            format!("{:.5}", x),
            format!("{:.6}", y),
            format!("{:.6}", dfgram.background_at(x)),
            format!("{:.6}", y_bg),
        ])?;
    }

    wtr.flush().map_err(|e| DfredError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })
}

/// 导出为 XY
pub fn to_xy(dfgram: &Dfgram, title: &str, output_path: &Path) -> Result<()> {
    let write_err = |e| DfredError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    };
    let file = File::create(output_path).map_err(write_err)?;
    let mut w = BufWriter::new(file);

    let gamma = dfgram.gamma_range();
    writeln!(w, "# Diffractogram: {}", title).map_err(write_err)?;
    writeln!(w, "# Gamma range: {:.3} .. {:.3} deg", gamma.min, gamma.max).map_err(write_err)?;
    writeln!(w, "# Columns: 2theta (degrees), Intensity").map_err(write_err)?;
    writeln!(w, "#").map_err(write_err)?;

    for (x, y) in dfgram.curve().points() {
        writeln!(w, "{:.5}\t{:.6}", x, y).map_err(write_err)?;
    }
    w.flush().map_err(write_err)
}
