//! # 峰参数表导出
//!
//! 每个 Cluster 一行的 CSV；未拟合或拟合失败时误差列为空。
//!
//! ## 依赖关系
//! - 被 `commands/peaks.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::calc::PeakInfo;
use crate::error::{DfredError, Result};
use crate::fit::DoubleWithError;

use std::path::Path;

fn value(d: &DoubleWithError) -> String {
    if d.value.is_finite() {
        format!("{:.6}", d.value)
    } else {
        String::new()
    }
}

fn error(d: &DoubleWithError) -> String {
    if d.error.is_finite() {
        format!("{}", d.rounded_error(4))
    } else {
        String::new()
    }
}

/// 导出峰参数表
pub fn peak_infos_to_csv(infos: &[PeakInfo], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    wtr.write_record([
        "cluster",
        "omega",
        "phi",
        "chi",
        "tth",
        "gamma",
        "alpha",
        "beta",
        "shape",
        "status",
        "center",
        "center_error",
        "fwhm",
        "fwhm_error",
        "intensity",
        "intensity_error",
    ])?;

    for info in infos {
        wtr.write_record(&[
            info.cluster.to_string(),
            format!("{:.4}", info.omg),
            format!("{:.4}", info.phi),
            format!("{:.4}", info.chi),
            format!("{:.4}", info.tth),
            format!("{:.4}", info.gamma),
            format!("{:.4}", info.alpha),
            format!("{:.4}", info.beta),
            info.shape.to_string(),
            info.status.to_string(),
            value(&info.center),
            error(&info.center),
            value(&info.fwhm),
            error(&info.fwhm),
            value(&info.intensity),
            error(&info.intensity),
        ])?;
    }

    wtr.flush().map_err(|e| DfredError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })
}
