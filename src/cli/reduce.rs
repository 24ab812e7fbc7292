//! # reduce 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/reduce.rs`

use super::common::{InputArgs, ReductionArgs};
use dfred::export::ExportFormat;

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 衍射图输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum DfgramFormat {
    /// CSV: 2theta, intensity, background, intensity minus background
    #[default]
    Csv,
    /// XY: commented header and two columns
    Xy,
}

impl From<DfgramFormat> for ExportFormat {
    fn from(f: DfgramFormat) -> Self {
        match f {
            DfgramFormat::Csv => ExportFormat::Csv,
            DfgramFormat::Xy => ExportFormat::Xy,
        }
    }
}

/// reduce 子命令参数
#[derive(Args, Debug)]
pub struct ReduceArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub reduction: ReductionArgs,

    /// Output directory for the per-cluster files
    #[arg(short, long, default_value = "dfgrams")]
    pub output: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: DfgramFormat,

    /// Number of parallel export jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Also export the diffractogram averaged over all active clusters
    #[arg(long, default_value_t = false)]
    pub average: bool,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
