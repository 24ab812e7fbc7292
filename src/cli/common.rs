//! # 共享参数
//!
//! 输入选择与归约设置在 `info` / `reduce` / `peaks` 之间共用。
//! 命令行给出的值覆盖设置文件中的值。
//!
//! ## 依赖关系
//! - 被 `cli/` 各子命令 flatten 使用
//! - 参数传递给 `commands/mod.rs` 构建会话

use dfred::models::Range;
use dfred::pars::NormMode;

use clap::{Args, ValueEnum};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// 输入
// ─────────────────────────────────────────────────────────────

/// 输入文件选择
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Input: a .dat digest, a TIFF image, or a directory of digests
    pub input: PathBuf,

    /// File name patterns when the input is a directory (comma separated)
    #[arg(long, default_value = "*.dat")]
    pub pattern: String,

    /// Recurse into subdirectories
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Detector arm angle 2θ (degrees) for images whose metadata lacks one
    #[arg(long)]
    pub tth: Option<f64>,
}

// ─────────────────────────────────────────────────────────────
// 归约设置
// ─────────────────────────────────────────────────────────────

/// 归一化模式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum NormArg {
    /// No normalization
    None,
    /// Divide by monitor counts
    Monitor,
    /// Divide by the monitor count increment across members
    DeltaMonitor,
    /// Divide by exposure time
    Time,
    /// Divide by the exposure time increment across members
    DeltaTime,
}

impl From<NormArg> for NormMode {
    fn from(arg: NormArg) -> Self {
        match arg {
            NormArg::None => NormMode::None,
            NormArg::Monitor => NormMode::Monitor,
            NormArg::DeltaMonitor => NormMode::DeltaMonitor,
            NormArg::Time => NormMode::Time,
            NormArg::DeltaTime => NormMode::DeltaTime,
        }
    }
}

/// 归约参数（覆盖设置文件）
#[derive(Args, Debug)]
pub struct ReductionArgs {
    /// Settings file (JSON) to start from
    #[arg(short, long, env = "DFRED_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Number of consecutive measurements combined into one cluster
    #[arg(short, long)]
    pub binning: Option<usize>,

    /// Intensity normalization mode
    #[arg(long, value_enum)]
    pub norm: Option<NormArg>,

    /// Number of 2θ bins (default: one bin per pixel width at the beam centre)
    #[arg(long)]
    pub bins: Option<usize>,

    /// Number of gamma sectors
    #[arg(long)]
    pub slices: Option<usize>,

    /// Gamma sector used for the diffractograms (0-based)
    #[arg(long)]
    pub slice: Option<usize>,

    /// Sum cluster members instead of averaging them
    #[arg(long, default_value_t = false)]
    pub sum: bool,

    /// Polynomial degree of the baseline
    #[arg(long)]
    pub degree: Option<usize>,

    /// Baseline fit range in 2θ, "min:max" (repeatable)
    #[arg(long = "baseline", value_parser = parse_range)]
    pub baseline: Vec<Range>,

    /// Flat-field correction file (.dat digest or TIFF)
    #[arg(long)]
    pub corr: Option<PathBuf>,
}

/// 解析 "min:max" 形式的区间（冒号分隔以允许负数）
pub fn parse_range(input: &str) -> Result<Range, String> {
    let (a, b) = input
        .split_once(':')
        .ok_or_else(|| format!("Invalid range '{}'. Expected 'min:max', e.g. '20:25.5'", input))?;
    let a: f64 = a
        .trim()
        .parse()
        .map_err(|_| format!("Invalid range start '{}'", a.trim()))?;
    let b: f64 = b
        .trim()
        .parse()
        .map_err(|_| format!("Invalid range end '{}'", b.trim()))?;
    if !a.is_finite() || !b.is_finite() || a == b {
        return Err(format!("Range '{}' must have two distinct finite ends", input));
    }
    Ok(Range::new(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let r = parse_range("20:25.5").unwrap();
        assert!((r.min - 20.0).abs() < 1e-12);
        assert!((r.max - 25.5).abs() < 1e-12);

        let r = parse_range("10:-10").unwrap();
        assert!((r.min + 10.0).abs() < 1e-12);

        assert!(parse_range("20-25").is_err());
        assert!(parse_range("a:1").is_err());
        assert!(parse_range("3:3").is_err());
    }
}
