//! # 统一错误处理模块
//!
//! 定义 dfred 的所有错误类型，使用 `thiserror` 派生。
//!
//! 拟合失败（不收敛、数据点不足）不属于错误，而是以
//! `fit::Fitted { success: false }` 的形式返回；调用方违反契约的情况
//! （同一序列中图像尺寸不一致、对失败的拟合求值）直接 panic。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// dfred 统一错误类型
#[derive(Error, Debug)]
pub enum DfredError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 数据错误
    // ─────────────────────────────────────────────────────────────
    #[error("Image size mismatch: expected {expected}, found {found}")]
    ImageSizeMismatch { expected: String, found: String },

    #[error("No data: {0}")]
    NoData(String),

    #[error("Correction image unusable: {0}")]
    CorrectionError(String),

    #[error("Bad normalization: {0}")]
    NormalizationError(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // CSV / JSON 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Settings error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, DfredError>;
