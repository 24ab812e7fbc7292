//! # info 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/info.rs`

use super::common::{InputArgs, ReductionArgs};

use clap::Args;

/// info 子命令参数
#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub reduction: ReductionArgs,

    /// Also compute diffractograms and show their 2θ / intensity ranges
    #[arg(long, default_value_t = false)]
    pub ranges: bool,
}
