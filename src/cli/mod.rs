//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `info`: 加载数据并列出 Cluster
//! - `reduce`: 导出每个 Cluster 的衍射图
//! - `peaks`: 拟合峰并导出峰参数表
//! - `init-settings`: 写出默认设置文件
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: common, info, reduce, peaks, settings

pub mod common;
pub mod info;
pub mod peaks;
pub mod reduce;
pub mod settings;

use clap::{Parser, Subcommand};

/// dfred - 衍射图归约与拟合工具
#[derive(Parser)]
#[command(name = "dfred")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Reduce 2-D diffraction detector images to diffractograms and fit peaks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v: info, -vv: debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Load measurements and list the clusters they are grouped into
    Info(info::InfoArgs),

    /// Compute the diffractogram of every active cluster and export it
    Reduce(reduce::ReduceArgs),

    /// Fit peaks on every active cluster and export the parameter table
    Peaks(peaks::PeaksArgs),

    /// Write a settings file with default values
    InitSettings(settings::InitSettingsArgs),
}
