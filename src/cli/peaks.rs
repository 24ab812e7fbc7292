//! # peaks 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/peaks.rs`

use super::common::{parse_range, InputArgs, ReductionArgs};
use dfred::models::Range;
use dfred::pars::PeakShape;

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 峰形
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ShapeArg {
    /// Raw statistics only, no fit
    Raw,
    /// Gaussian [center, fwhm, height]
    #[default]
    Gaussian,
    /// Lorentzian [center, fwhm, height]
    Lorentzian,
    /// Pseudo-Voigt with one shared width [center, fwhm, height, eta]
    PseudoVoigt1,
    /// Pseudo-Voigt with separate widths [center, fwhm_g, fwhm_l, height, eta]
    PseudoVoigt2,
}

impl From<ShapeArg> for PeakShape {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Raw => PeakShape::Raw,
            ShapeArg::Gaussian => PeakShape::Gaussian,
            ShapeArg::Lorentzian => PeakShape::Lorentzian,
            ShapeArg::PseudoVoigt1 => PeakShape::PseudoVoigt1,
            ShapeArg::PseudoVoigt2 => PeakShape::PseudoVoigt2,
        }
    }
}

/// peaks 子命令参数
#[derive(Args, Debug)]
pub struct PeaksArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub reduction: ReductionArgs,

    /// Peak fit range in 2θ, "min:max" (repeatable; added after peaks from the settings file)
    #[arg(long = "peak", value_parser = parse_range)]
    pub peaks: Vec<Range>,

    /// Peak shape for the peaks given with --peak
    #[arg(long, value_enum, default_value = "gaussian")]
    pub shape: ShapeArg,

    /// Output CSV; with several peaks a "_peakN" suffix is added per peak
    #[arg(short, long, default_value = "peaks.csv")]
    pub output: PathBuf,

    /// Also write the pole figure of each peak to this CSV ("_peakN" suffix as for --output)
    #[arg(long)]
    pub pole_figure: Option<PathBuf>,

    /// Interpolate the pole figure onto a regular alpha/beta grid
    #[arg(long, default_value_t = false)]
    pub interpolate: bool,

    /// Number of table rows printed per peak
    #[arg(long, default_value_t = 20)]
    pub top_n: usize,
}
