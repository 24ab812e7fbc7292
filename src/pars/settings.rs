//! # 会话设置集合
//!
//! 把全部可持久化设置聚合成一个可序列化结构，供外部以 JSON 读写。
//! `Session::apply_settings` 接收它并使所有缓存失效。
//!
//! ## 依赖关系
//! - 被 `session.rs`, `commands/` 使用
//! - 使用 `serde_json` 读写文件

use crate::error::{DfredError, Result};
use crate::pars::{
    BaselineSettings, Geometry, ImageCut, ImageTransform, InterpolParams, Params, PeakSettings,
};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// 会话的全部可持久化设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub geometry: Geometry,
    pub transform: ImageTransform,
    pub cut: ImageCut,
    pub params: Params,
    pub baseline: BaselineSettings,
    pub peaks: Vec<PeakSettings>,
    pub interpolation: InterpolParams,
    /// 每个 Cluster 的测量数
    pub binning_factor: usize,
    /// 平场校正是否启用（校正图像已加载时）
    pub corr_enabled: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            transform: ImageTransform::default(),
            cut: ImageCut::default(),
            params: Params::default(),
            baseline: BaselineSettings::default(),
            peaks: Vec::new(),
            interpolation: InterpolParams::default(),
            binning_factor: 1,
            corr_enabled: true,
        }
    }
}

impl SessionSettings {
    /// 从 JSON 文件读取
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DfredError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let settings: SessionSettings = serde_json::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 写入 JSON 文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| DfredError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// 与图像尺寸无关的合法性检查
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        self.params.gamma.validate()?;
        self.interpolation.validate()?;
        if self.binning_factor == 0 {
            return Err(DfredError::InvalidArgument(
                "binning factor must be at least 1".to_string(),
            ));
        }
        if self.baseline.polynom_degree > BaselineSettings::MAX_POLYNOM_DEGREE {
            return Err(DfredError::InvalidArgument(format!(
                "baseline polynomial degree {} exceeds maximum {}",
                self.baseline.polynom_degree,
                BaselineSettings::MAX_POLYNOM_DEGREE
            )));
        }
        if self.params.binning.tth_bins == Some(0) {
            return Err(DfredError::InvalidArgument(
                "number of 2theta bins must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Range;
    use crate::pars::{NormMode, PeakShape};

    #[test]
    fn test_settings_json_roundtrip() {
        let mut s = SessionSettings::default();
        s.binning_factor = 3;
        s.params.norm_mode = NormMode::Monitor;
        s.baseline.ranges.add(Range::new(10.0, 20.0));
        s.peaks
            .push(PeakSettings::new(Range::new(30.0, 32.0), PeakShape::Lorentzian));

        let json = s.to_json().unwrap();
        let back = SessionSettings::from_json(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_settings_partial_json() {
        let s = SessionSettings::from_json(r#"{"binning_factor": 2}"#).unwrap();
        assert_eq!(s.binning_factor, 2);
        assert_eq!(s.geometry, Geometry::default());
        assert!(s.corr_enabled);
    }

    #[test]
    fn test_settings_validate_rejects_zero_binning() {
        assert!(SessionSettings::from_json(r#"{"binning_factor": 0}"#).is_err());
        assert!(SessionSettings::from_json(r#"{"baseline": {"polynom_degree": 12}}"#).is_err());
        assert!(SessionSettings::from_json(r#"{"interpolation": {"threshold": 0}}"#).is_err());
    }
}
