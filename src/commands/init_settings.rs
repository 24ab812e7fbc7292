//! # init-settings 子命令实现
//!
//! 写出默认设置 JSON，作为 `--settings` 的编辑起点。
//!
//! ## 依赖关系
//! - 使用 `cli/settings.rs` 定义的 InitSettingsArgs
//! - 使用 `dfred::pars::SessionSettings`

use crate::cli::settings::InitSettingsArgs;
use crate::utils::output;

use dfred::pars::SessionSettings;
use dfred::Result;

/// 执行 init-settings
pub fn execute(args: InitSettingsArgs) -> Result<()> {
    if args.output.exists() && !args.overwrite {
        output::print_skip(&format!(
            "'{}' exists (use --overwrite to replace it)",
            args.output.display()
        ));
        return Ok(());
    }

    SessionSettings::default().save(&args.output)?;
    output::print_success(&format!("Default settings written to '{}'", args.output.display()));
    Ok(())
}
