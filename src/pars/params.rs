//! # 归约参数
//!
//! 归一化模式、2θ 分箱、γ 扇区选择与强度标度。改变其中任何一项，
//! 所有衍射图缓存都必须失效。
//!
//! ## 依赖关系
//! - 被 `calc/dfgram.rs`, `session.rs` 使用
//! - 使用 `serde` 派生序列化

use crate::error::{DfredError, Result};
use crate::models::Range;

use serde::{Deserialize, Serialize};

/// 强度归一化模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormMode {
    /// 不归一化
    #[default]
    None,
    /// 除以监视器计数
    Monitor,
    /// 除以监视器计数的成员间变化
    DeltaMonitor,
    /// 除以曝光时间
    Time,
    /// 除以曝光时间的成员间变化
    DeltaTime,
}

impl std::fmt::Display for NormMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormMode::None => write!(f, "none"),
            NormMode::Monitor => write!(f, "monitor"),
            NormMode::DeltaMonitor => write!(f, "delta-monitor"),
            NormMode::Time => write!(f, "time"),
            NormMode::DeltaTime => write!(f, "delta-time"),
        }
    }
}

/// 2θ 分箱参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningParams {
    /// 显式分箱数；None 表示按束心像素角宽自动确定
    pub tth_bins: Option<usize>,
}

/// γ（方位角）扇区选择
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GammaSelection {
    /// 扇区数（≥ 1）
    pub slices: usize,
    /// 当前扇区序号（< slices）
    pub slice: usize,
    /// 显式 γ 范围；None 表示使用 Cluster 的全部有效范围
    pub range: Option<Range>,
}

impl Default for GammaSelection {
    fn default() -> Self {
        Self {
            slices: 1,
            slice: 0,
            range: None,
        }
    }
}

impl GammaSelection {
    pub fn validate(&self) -> Result<()> {
        if self.slices == 0 {
            return Err(DfredError::InvalidArgument(
                "number of gamma slices must be at least 1".to_string(),
            ));
        }
        if self.slice >= self.slices {
            return Err(DfredError::InvalidArgument(format!(
                "gamma slice {} out of range (0..{})",
                self.slice, self.slices
            )));
        }
        Ok(())
    }

    /// 给定完整 γ 范围时第 `slice` 个扇区
    pub fn sector(&self, full: &Range, slice: usize) -> GammaSector {
        let base = match &self.range {
            Some(r) => full.intersect(r),
            None => *full,
        };
        GammaSector {
            range: base.slice(slice, self.slices),
            closed: slice + 1 >= self.slices,
        }
    }
}

/// 一个 γ 扇区：`[min, max)`，最后一个扇区为 `[min, max]`
///
/// 相邻扇区不重叠，全部扇区恰好覆盖完整范围，每个像素只落入一个扇区。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaSector {
    pub range: Range,
    /// 是否包含上端点
    pub closed: bool,
}

impl GammaSector {
    /// 覆盖整个范围的单一扇区
    pub fn whole(range: Range) -> Self {
        Self {
            range,
            closed: true,
        }
    }

    pub fn contains(&self, gamma: f64) -> bool {
        gamma >= self.range.min
            && (gamma < self.range.max || (self.closed && gamma <= self.range.max))
    }
}

/// 强度参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityParams {
    /// 整体强度标度
    pub scale: f64,
    /// true（默认）: 对 Cluster 成员取平均；false: 求和
    pub average_members: bool,
}

impl Default for IntensityParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            average_members: true,
        }
    }
}

/// 全局归约参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub norm_mode: NormMode,
    pub binning: BinningParams,
    pub gamma: GammaSelection,
    pub intensity: IntensityParams,
    /// 不完整的 Cluster 是否排除在批量分析之外
    pub drop_incomplete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gamma_selection_validate() {
        assert!(GammaSelection::default().validate().is_ok());
        let bad = GammaSelection {
            slices: 2,
            slice: 2,
            range: None,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_gamma_sector_with_explicit_range() {
        let sel = GammaSelection {
            slices: 2,
            slice: 0,
            range: Some(Range::new(-10.0, 30.0)),
        };
        let full = Range::new(-20.0, 20.0);
        let s1 = sel.sector(&full, 1);
        assert!((s1.range.min - 5.0).abs() < 1e-12);
        assert!((s1.range.max - 20.0).abs() < 1e-12);
        assert!(s1.closed);
    }

    #[test]
    fn test_gamma_sectors_are_half_open() {
        let sel = GammaSelection {
            slices: 2,
            slice: 0,
            range: None,
        };
        let full = Range::new(-90.0, 90.0);
        let lower = sel.sector(&full, 0);
        let upper = sel.sector(&full, 1);
        // 边界 0 只属于上面的扇区
        assert!(!lower.contains(0.0));
        assert!(upper.contains(0.0));
        assert!(lower.contains(-90.0));
        assert!(upper.contains(90.0));
        assert!(!upper.contains(90.000001));
    }

    #[test]
    fn test_norm_mode_serde_names() {
        let json = serde_json::to_string(&NormMode::DeltaMonitor).unwrap();
        assert_eq!(json, "\"delta_monitor\"");
        let back: NormMode = serde_json::from_str("\"time\"").unwrap();
        assert_eq!(back, NormMode::Time);
    }
}
