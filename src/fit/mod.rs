//! # 曲线拟合模块
//!
//! 多项式基线与峰形函数的非线性最小二乘拟合。数据点少于参数个数、
//! 不收敛或 Jacobian 奇异时返回失败的 `Fitted`，不产生错误。
//!
//! ## 依赖关系
//! - 被 `calc/dfgram.rs`, `calc/peak_info.rs` 使用
//! - 子模块: function, levmar, outcome, raw

pub mod function;
pub mod levmar;
pub mod outcome;
pub mod raw;

pub use function::{FitFunction, ParametricFunction, PeakFunction, Polynomial};
pub use levmar::{levenberg_marquardt, LmOptions};
pub use outcome::{DoubleWithError, Fitted};
pub use raw::RawOutcome;

use crate::models::Curve;

/// 以给定初值拟合任意函数
pub fn fit_function(function: FitFunction, curve: &Curve, initial: &[f64]) -> Fitted {
    if curve.len() < function.par_count() {
        log::debug!(
            "skipping fit: {} points for {} parameters",
            curve.len(),
            function.par_count()
        );
        return Fitted::failure();
    }

    match levenberg_marquardt(&function, curve.xs(), curve.ys(), initial, LmOptions::default()) {
        Some(sol) => {
            log::debug!(
                "fit converged after {} iterations, ssr = {:.4e}",
                sol.iterations,
                sol.ssr
            );
            Fitted::new(function, &sol.params, &sol.errors)
        }
        None => {
            log::debug!("fit failed on {} points", curve.len());
            Fitted::failure()
        }
    }
}

/// 拟合 `degree` 阶多项式
pub fn fit_polynomial(curve: &Curve, degree: usize) -> Fitted {
    let mut initial = vec![0.0; degree + 1];
    if !curve.is_empty() {
        initial[0] = curve.ys().iter().sum::<f64>() / curve.len() as f64;
    }
    fit_function(FitFunction::Polynomial(Polynomial::new(degree)), curve, &initial)
}

/// 拟合峰形，初值取自 `guess`（通常为窗口数据的原始统计）
pub fn fit_peak(function: PeakFunction, curve: &Curve, guess: &RawOutcome) -> Fitted {
    let fwhm = if guess.fwhm.is_finite() && guess.fwhm > 0.0 {
        guess.fwhm
    } else {
        curve.range_x().width() / 4.0
    };
    let initial = function.initial_parameters(guess.center, fwhm, guess.height);
    if initial.iter().any(|v| !v.is_finite()) {
        return Fitted::failure();
    }
    fit_function(FitFunction::Peak(function), curve, &initial)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampled<F: Fn(f64) -> f64>(from: f64, to: f64, n: usize, f: F) -> Curve {
        let step = (to - from) / (n - 1) as f64;
        Curve::from_points((0..n).map(|i| {
            let x = from + i as f64 * step;
            (x, f(x))
        }))
    }

    #[test]
    fn test_gaussian_round_trip() {
        let truth = [38.2, 0.35, 1500.0];
        let g = PeakFunction::Gaussian;
        let curve = sampled(37.0, 39.5, 101, |x| g.y(&truth, x));

        let fitted = fit_peak(g, &curve, &RawOutcome::from_curve(&curve));
        assert!(fitted.success());
        for (p, want) in fitted.parameters().iter().zip(truth) {
            assert!((p.value - want).abs() / want < 1e-6, "{} vs {}", p.value, want);
        }
    }

    #[test]
    fn test_pseudo_voigt_round_trip() {
        let truth = [60.0, 0.5, 80.0, 0.3];
        let f = PeakFunction::PseudoVoigt1;
        let curve = sampled(58.0, 62.0, 161, |x| f.y(&truth, x));

        let fitted = fit_peak(f, &curve, &RawOutcome::from_curve(&curve));
        assert!(fitted.success());
        for (p, want) in fitted.parameters().iter().zip(truth) {
            assert!((p.value - want).abs() / want < 1e-6);
        }
    }

    #[test]
    fn test_too_few_points_not_attempted() {
        let curve = Curve::from_points([(1.0, 1.0), (2.0, 3.0)]);
        for f in PeakFunction::ALL {
            let fitted = fit_peak(f, &curve, &RawOutcome::from_curve(&curve));
            assert!(!fitted.success());
            assert!(fitted.parameters().is_empty());
        }
        // 原始统计仍可用
        assert_eq!(RawOutcome::from_curve(&curve).height, 3.0);
    }

    #[test]
    fn test_polynomial_fit() {
        let curve = sampled(20.0, 80.0, 61, |x| 5.0 + 0.2 * x - 0.001 * x * x);
        let fitted = fit_polynomial(&curve, 2);
        assert!(fitted.success());
        let p = fitted.par_values();
        assert!((p[0] - 5.0).abs() < 1e-6);
        assert!((p[1] - 0.2).abs() < 1e-7);
        assert!((p[2] + 0.001).abs() < 1e-9);
        assert!((fitted.y(50.0) - (5.0 + 10.0 - 2.5)).abs() < 1e-8);
    }

    #[test]
    fn test_polynomial_with_empty_curve() {
        assert!(!fit_polynomial(&Curve::new(), 1).success());
    }
}
