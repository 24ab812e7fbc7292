//! # 基线拟合参数
//!
//! 多项式阶数与拟合区间集合。
//!
//! ## 依赖关系
//! - 被 `calc/dfgram.rs`, `session.rs` 使用

use crate::models::Ranges;

use serde::{Deserialize, Serialize};

/// 基线拟合参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineSettings {
    /// 多项式阶数
    pub polynom_degree: usize,
    /// 拟合区间；为空时不拟合基线
    pub ranges: Ranges,
}

impl BaselineSettings {
    pub const MAX_POLYNOM_DEGREE: usize = 8;

    /// 是否配置了基线拟合
    pub fn is_configured(&self) -> bool {
        !self.ranges.is_empty()
    }
}

impl Default for BaselineSettings {
    fn default() -> Self {
        Self {
            polynom_degree: 2,
            ranges: Ranges::new(),
        }
    }
}
