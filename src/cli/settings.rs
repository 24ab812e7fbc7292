//! # init-settings 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/init_settings.rs`

use clap::Args;
use std::path::PathBuf;

/// init-settings 子命令参数
#[derive(Args, Debug)]
pub struct InitSettingsArgs {
    /// Output settings file
    #[arg(short, long, default_value = "dfred_settings.json")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
