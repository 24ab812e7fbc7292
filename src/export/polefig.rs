//! # 极图导出
//!
//! 每个极图点一行的 CSV：`alpha,beta,center,fwhm,intensity`；
//! 没有数据的网格点数值列为空。
//!
//! ## 依赖关系
//! - 被 `commands/peaks.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::calc::PolePoint;
use crate::error::{DfredError, Result};

use std::path::Path;

fn cell(v: f64) -> String {
    if v.is_finite() {
        format!("{:.6}", v)
    } else {
        String::new()
    }
}

/// 导出极图
pub fn pole_figure_to_csv(points: &[PolePoint], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    wtr.write_record(["alpha", "beta", "center", "fwhm", "intensity"])?;

    for p in points {
        wtr.write_record(&[
            format!("{:.4}", p.alpha),
            format!("{:.4}", p.beta),
            cell(p.center),
            cell(p.fwhm),
            cell(p.intensity),
        ])?;
    }

    wtr.flush().map_err(|e| DfredError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })
}
