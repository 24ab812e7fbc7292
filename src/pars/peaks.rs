//! # 峰设置
//!
//! 每个峰由 2θ 区间、峰形与可选的用户初值组成。`Raw` 峰形只做极值统计，
//! 不做形状拟合。
//!
//! ## 依赖关系
//! - 被 `calc/dfgram.rs`, `session.rs` 使用
//! - 使用 `fit::PeakFunction` 作为拟合峰形

use crate::fit::PeakFunction;
use crate::models::Range;

use serde::{Deserialize, Serialize};

/// 峰形
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakShape {
    /// 仅统计，不拟合
    Raw,
    #[default]
    Gaussian,
    Lorentzian,
    PseudoVoigt1,
    PseudoVoigt2,
}

impl PeakShape {
    /// 对应的拟合函数；`Raw` 没有
    pub fn fit_function(&self) -> Option<PeakFunction> {
        match self {
            PeakShape::Raw => None,
            PeakShape::Gaussian => Some(PeakFunction::Gaussian),
            PeakShape::Lorentzian => Some(PeakFunction::Lorentzian),
            PeakShape::PseudoVoigt1 => Some(PeakFunction::PseudoVoigt1),
            PeakShape::PseudoVoigt2 => Some(PeakFunction::PseudoVoigt2),
        }
    }

    /// 峰形参数个数（`Raw` 为 0）
    pub fn par_count(&self) -> usize {
        use crate::fit::ParametricFunction;
        self.fit_function().map_or(0, |f| f.par_count())
    }
}

impl std::fmt::Display for PeakShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.fit_function() {
            Some(func) => write!(f, "{}", func),
            None => write!(f, "Raw"),
        }
    }
}

/// 用户给定的峰初值，未给出的项由原始统计推断
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakGuess {
    pub center: Option<f64>,
    pub fwhm: Option<f64>,
    pub height: Option<f64>,
}

impl PeakGuess {
    pub fn is_empty(&self) -> bool {
        self.center.is_none() && self.fwhm.is_none() && self.height.is_none()
    }
}

/// 单个峰的设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakSettings {
    pub range: Range,
    #[serde(default)]
    pub shape: PeakShape,
    #[serde(default)]
    pub guess: PeakGuess,
}

impl PeakSettings {
    pub fn new(range: Range, shape: PeakShape) -> Self {
        Self {
            range,
            shape,
            guess: PeakGuess::default(),
        }
    }

    pub fn with_guess(mut self, guess: PeakGuess) -> Self {
        self.guess = guess;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_fit_function() {
        assert_eq!(PeakShape::Raw.fit_function(), None);
        assert_eq!(PeakShape::Raw.par_count(), 0);
        assert_eq!(
            PeakShape::PseudoVoigt2.fit_function(),
            Some(PeakFunction::PseudoVoigt2)
        );
        assert_eq!(PeakShape::PseudoVoigt1.par_count(), 4);
        assert_eq!(PeakShape::Lorentzian.to_string(), "Lorentzian");
    }

    #[test]
    fn test_peak_settings_json_defaults() {
        let json = r#"{"range":{"min":40.0,"max":44.0}}"#;
        let p: PeakSettings = serde_json::from_str(json).unwrap();
        assert_eq!(p.shape, PeakShape::Gaussian);
        assert!(p.guess.is_empty());
        assert_eq!(p.range, Range::new(40.0, 44.0));

        let raw: PeakShape = serde_json::from_str("\"pseudo_voigt1\"").unwrap();
        assert_eq!(raw, PeakShape::PseudoVoigt1);
    }
}
