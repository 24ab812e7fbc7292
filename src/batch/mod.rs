//! # 批量处理模块
//!
//! ## 功能
//! - 收集输入文件（单文件或目录）
//! - 在线程池中并行执行任务，带进度与统计
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::{BatchRunner, ProcessResult};
