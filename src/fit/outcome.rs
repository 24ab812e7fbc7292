//! # 拟合结果
//!
//! - `DoubleWithError`: 数值及其标准误差，支持按有效数字舍入误差
//! - `Fitted`: 一次拟合的不可变结果。失败的拟合不含函数与参数，
//!   调用方必须先检查 `success()` 再调用 `y(x)`
//!
//! ## 依赖关系
//! - 被 `fit/mod.rs`, `calc/dfgram.rs`, `calc/peak_info.rs` 使用
//! - 使用 `fit/function.rs`

use crate::fit::function::{FitFunction, ParametricFunction, PeakFunction};

use serde::Serialize;

/// 带标准误差的数值
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DoubleWithError {
    pub value: f64,
    pub error: f64,
}

impl DoubleWithError {
    pub fn new(value: f64, error: f64) -> Self {
        Self { value, error }
    }

    /// 没有误差估计的数值（误差为 NaN）
    pub fn exact(value: f64) -> Self {
        Self::new(value, f64::NAN)
    }

    /// 误差舍入到 `prec` 位有效数字，舍入位置以 |value| 与 |error| 中
    /// 较大者的量级为准
    pub fn rounded_error(&self, prec: i32) -> f64 {
        let mag = self.value.abs().max(self.error.abs());
        if !mag.is_finite() || mag == 0.0 {
            return self.error;
        }
        let n = 1 + mag.log10().floor() as i32;
        let fac = 10f64.powi(prec - n);
        (self.error * fac).round() / fac
    }
}

impl Default for DoubleWithError {
    fn default() -> Self {
        Self::exact(f64::NAN)
    }
}

impl std::fmt::Display for DoubleWithError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.error.is_nan() {
            write!(f, "{:.4}", self.value)
        } else {
            write!(f, "{:.4} ± {}", self.value, self.rounded_error(4))
        }
    }
}

/// 一次拟合的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Fitted {
    /// 成功时的函数与参数
    fit: Option<(FitFunction, Vec<DoubleWithError>)>,
}

impl Fitted {
    /// 成功的拟合
    pub fn new(function: FitFunction, values: &[f64], errors: &[f64]) -> Self {
        assert_eq!(
            values.len(),
            function.par_count(),
            "parameter count does not match fit function"
        );
        assert_eq!(values.len(), errors.len(), "one error per parameter");
        let pars = values
            .iter()
            .zip(errors)
            .map(|(v, e)| DoubleWithError::new(*v, *e))
            .collect();
        Self {
            fit: Some((function, pars)),
        }
    }

    /// 失败的拟合
    pub fn failure() -> Self {
        Self { fit: None }
    }

    pub fn success(&self) -> bool {
        self.fit.is_some()
    }

    pub fn function(&self) -> Option<&FitFunction> {
        self.fit.as_ref().map(|(f, _)| f)
    }

    /// 拟合参数；失败时为空
    pub fn parameters(&self) -> &[DoubleWithError] {
        self.fit.as_ref().map_or(&[], |(_, p)| p.as_slice())
    }

    pub fn par_values(&self) -> Vec<f64> {
        self.parameters().iter().map(|p| p.value).collect()
    }

    /// 在 x 处求值
    ///
    /// # Panics
    /// 对失败的拟合调用
    pub fn y(&self, x: f64) -> f64 {
        let Some((function, pars)) = &self.fit else {
            panic!("y(x) called on a failed fit");
        };
        let p: Vec<f64> = pars.iter().map(|d| d.value).collect();
        function.y(&p, x)
    }

    /// 峰拟合的峰形
    pub fn peak_function(&self) -> Option<PeakFunction> {
        match self.function() {
            Some(FitFunction::Peak(f)) => Some(*f),
            _ => None,
        }
    }

    /// 峰中心
    pub fn center(&self) -> Option<DoubleWithError> {
        let f = self.peak_function()?;
        Some(self.parameters()[f.center_index()])
    }

    /// 峰高
    pub fn height(&self) -> Option<DoubleWithError> {
        let f = self.peak_function()?;
        Some(self.parameters()[f.height_index()])
    }

    /// 半高宽；PseudoVoigt2 按 eta 加权两种宽度，误差按各自相对误差合成
    pub fn fwhm(&self) -> Option<DoubleWithError> {
        let f = self.peak_function()?;
        let pars = self.parameters();
        let value = f.fwhm(&self.par_values());
        let error = match f {
            PeakFunction::PseudoVoigt2 => {
                let eta = pars[4].value;
                ((1.0 - eta) * pars[1].error).hypot(eta * pars[2].error)
            }
            _ => pars[1].error,
        };
        Some(DoubleWithError::new(value, error))
    }

    /// 积分强度；误差由峰高与宽度的相对误差合成
    pub fn intensity(&self) -> Option<DoubleWithError> {
        let f = self.peak_function()?;
        let value = f.intensity(&self.par_values());
        let height = self.height()?;
        let fwhm = self.fwhm()?;
        let rel = (height.error / height.value).hypot(fwhm.error / fwhm.value);
        Some(DoubleWithError::new(value, (value * rel).abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::function::Polynomial;

    #[test]
    fn test_rounded_error_anchored_to_value() {
        let d = DoubleWithError::new(1.2345, 0.01234);
        assert!((d.rounded_error(3) - 0.01).abs() < 1e-12);

        // 误差大于数值时以误差量级为准
        let d = DoubleWithError::new(0.5, 12.34);
        assert!((d.rounded_error(2) - 12.0).abs() < 1e-12);

        let d = DoubleWithError::new(123.456, 0.0123);
        assert_eq!(d.rounded_error(4), 0.0);

        let zero = DoubleWithError::new(0.0, 0.0);
        assert_eq!(zero.rounded_error(3), 0.0);
    }

    #[test]
    fn test_failed_fit_has_no_parameters() {
        let f = Fitted::failure();
        assert!(!f.success());
        assert!(f.function().is_none());
        assert!(f.parameters().is_empty());
        assert!(f.center().is_none());
    }

    #[test]
    #[should_panic(expected = "failed fit")]
    fn test_failed_fit_y_panics() {
        Fitted::failure().y(1.0);
    }

    #[test]
    fn test_fitted_polynomial_eval() {
        let f = Fitted::new(
            FitFunction::Polynomial(Polynomial::new(1)),
            &[1.0, 2.0],
            &[0.1, 0.2],
        );
        assert!(f.success());
        assert!((f.y(3.0) - 7.0).abs() < 1e-12);
        assert!(f.peak_function().is_none());
    }

    #[test]
    fn test_fitted_peak_accessors() {
        let f = Fitted::new(
            FitFunction::Peak(PeakFunction::Gaussian),
            &[20.0, 0.5, 10.0],
            &[0.01, 0.05, 1.0],
        );
        assert_eq!(f.center().unwrap().value, 20.0);
        assert_eq!(f.fwhm().unwrap().error, 0.05);
        let i = f.intensity().unwrap();
        assert!((i.value - 10.0 * 0.5 * 1.064_467_019).abs() < 1e-6);
        // 两个 10% 相对误差合成
        assert!((i.error / i.value - 0.02f64.sqrt()).abs() < 1e-9);
    }
}
