//! # dfred - 衍射图归约命令行工具
//!
//! ## 子命令
//! - `info`          - 加载数据并列出 Cluster
//! - `reduce`        - 计算并导出每个 Cluster 的衍射图
//! - `peaks`         - 拟合峰并导出峰参数表
//! - `init-settings` - 写出默认设置 JSON
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     └── dfred  (核心库：会话、加载、导出)
//!   ├── batch/      (并行批量执行)
//!   └── utils/      (输出样式、进度条)
//! ```

mod batch;
mod cli;
mod commands;
mod utils;

use clap::Parser;
use cli::Cli;
use flexi_logger::{Logger, LoggerHandle};

/// 日志输出到 stderr；RUST_LOG 优先于 --verbose
fn setup_logging(verbose: u8) -> Option<LoggerHandle> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    match Logger::try_with_env_or_str(level).and_then(|l| l.log_to_stderr().start()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("failed to initialize logging: {}", e);
            None
        }
    }
}

fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    let _logger = setup_logging(cli.verbose);

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
