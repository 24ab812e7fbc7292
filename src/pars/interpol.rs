//! # 极图插值参数
//!
//! 控制把各 Cluster 的峰参数插值到规则 (α, β) 网格上的方式。
//! 只影响极图；改变它不会使衍射图缓存失效。
//!
//! ## 依赖关系
//! - 被 `calc/polefig.rs`, `session.rs` 使用
//! - 使用 `serde` 派生序列化

use crate::error::{DfredError, Result};

use serde::{Deserialize, Serialize};

/// 极图插值参数（角度单位：度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolParams {
    /// false: 极图直接由测量点组成
    pub enabled: bool,
    /// 网格 α 步长
    pub step_alpha: f64,
    /// 网格 β 步长
    pub step_beta: f64,
    /// 反距离加权的搜索半径
    pub idw_radius: f64,
    /// α 不超过此值的网格点先尝试半径内取平均
    pub avg_alpha_max: f64,
    /// 取平均的搜索半径
    pub avg_radius: f64,
    /// 取平均时保留的测量点百分比（以中位数为中心），1..=100
    pub threshold: u32,
}

impl Default for InterpolParams {
    fn default() -> Self {
        Self {
            enabled: false,
            step_alpha: 5.0,
            step_beta: 5.0,
            idw_radius: 10.0,
            avg_alpha_max: 15.0,
            avg_radius: 5.0,
            threshold: 100,
        }
    }
}

impl InterpolParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.step_alpha > 0.0 && self.step_alpha <= 90.0) {
            return Err(DfredError::InvalidArgument(format!(
                "alpha step must be in (0, 90], got {}",
                self.step_alpha
            )));
        }
        if !(self.step_beta > 0.0 && self.step_beta <= 360.0) {
            return Err(DfredError::InvalidArgument(format!(
                "beta step must be in (0, 360], got {}",
                self.step_beta
            )));
        }
        for (name, value) in [
            ("idw radius", self.idw_radius),
            ("averaging alpha maximum", self.avg_alpha_max),
            ("averaging radius", self.avg_radius),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(DfredError::InvalidArgument(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !(1..=100).contains(&self.threshold) {
            return Err(DfredError::InvalidArgument(format!(
                "inclusion threshold must be 1..=100 percent, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(InterpolParams::default().validate().is_ok());
        assert!(!InterpolParams::default().enabled);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = InterpolParams::default();
        assert!(InterpolParams { step_alpha: 0.0, ..base }.validate().is_err());
        assert!(InterpolParams { step_beta: 400.0, ..base }.validate().is_err());
        assert!(InterpolParams { avg_radius: -1.0, ..base }.validate().is_err());
        assert!(InterpolParams { idw_radius: f64::NAN, ..base }.validate().is_err());
        assert!(InterpolParams { threshold: 0, ..base }.validate().is_err());
    }
}
