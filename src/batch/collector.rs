//! # 输入文件收集
//!
//! 输入可以是单个 `.dat` 摘要 / TIFF 图像，也可以是包含摘要的目录。
//! 目录下按文件名 glob 模式匹配（逗号分隔的多个模式），结果按路径排序，
//! 保证 Cluster 编号在多次运行间一致。
//!
//! ## 依赖关系
//! - 被 `commands/mod.rs` 调用
//! - 使用 `walkdir` 遍历目录
//! - 使用 `glob` 匹配文件名

use dfred::{DfredError, Result};

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 文件收集器
pub struct FileCollector {
    /// 输入路径
    input: PathBuf,
    /// 匹配模式列表
    patterns: Vec<Pattern>,
    /// 是否递归
    recursive: bool,
}

impl FileCollector {
    /// 创建新的文件收集器，默认匹配所有文件
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: Vec::new(),
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    DfredError::InvalidArgument(format!("Invalid pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.input.is_file() {
            return vec![self.input.clone()];
        }

        if !self.input.is_dir() {
            return vec![];
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let walker = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file());

        let mut files: Vec<PathBuf> = walker
            .filter(|entry| self.matches_patterns(entry.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }

    /// 检查文件是否匹配任一模式；未设置模式时匹配全部
    fn matches_patterns(&self, path: &Path) -> bool {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };

        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(filename))
    }
}
