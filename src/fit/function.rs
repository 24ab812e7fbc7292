//! # 参数化拟合函数
//!
//! 封闭的函数集合 {多项式, Gaussian, Lorentzian, PseudoVoigt1, PseudoVoigt2}，
//! 通过 `ParametricFunction` 能力接口（求值、Jacobian、参数个数）分派。
//! 新增峰形只需扩展 `PeakFunction` 及其分派表，无需改动拟合引擎。
//!
//! ## 峰形参数
//! - Gaussian / Lorentzian: `[center, fwhm, height]`
//! - PseudoVoigt1: `[center, fwhm, height, eta]`（共用宽度）
//! - PseudoVoigt2: `[center, fwhm_gauss, fwhm_lorentz, height, eta]`
//!
//! ## 依赖关系
//! - 被 `fit/levmar.rs`, `fit/outcome.rs` 使用
//! - 使用 `nalgebra` 存放 Jacobian

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use std::f64::consts::{LN_2, PI};

/// 参数化函数的能力接口
pub trait ParametricFunction {
    /// 参数个数
    fn par_count(&self) -> usize;

    /// 对所有 x 计算 y
    fn set_y(&self, p: &[f64], xs: &[f64], ys: &mut [f64]);

    /// 计算 Jacobian，行对应数据点，列对应参数
    fn set_dy(&self, p: &[f64], xs: &[f64], jacobian: &mut DMatrix<f64>);

    /// 单点求值
    fn y(&self, p: &[f64], x: f64) -> f64 {
        let mut y = [0.0];
        self.set_y(p, &[x], &mut y);
        y[0]
    }
}

// ─────────────────────────────────────────────────────────────
// 多项式
// ─────────────────────────────────────────────────────────────

/// 多项式 y = Σ p_k x^k
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polynomial {
    pub degree: usize,
}

impl Polynomial {
    pub fn new(degree: usize) -> Self {
        Self { degree }
    }
}

impl ParametricFunction for Polynomial {
    fn par_count(&self) -> usize {
        self.degree + 1
    }

    fn set_y(&self, p: &[f64], xs: &[f64], ys: &mut [f64]) {
        for (x, y) in xs.iter().zip(ys.iter_mut()) {
            // Horner
            *y = p.iter().rev().fold(0.0, |acc, c| acc * x + c);
        }
    }

    fn set_dy(&self, _p: &[f64], xs: &[f64], jacobian: &mut DMatrix<f64>) {
        for (i, x) in xs.iter().enumerate() {
            let mut pow = 1.0;
            for k in 0..=self.degree {
                jacobian[(i, k)] = pow;
                pow *= x;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 峰形函数
// ─────────────────────────────────────────────────────────────

/// 峰形函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakFunction {
    Gaussian,
    Lorentzian,
    PseudoVoigt1,
    PseudoVoigt2,
}

impl std::fmt::Display for PeakFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeakFunction::Gaussian => write!(f, "Gaussian"),
            PeakFunction::Lorentzian => write!(f, "Lorentzian"),
            PeakFunction::PseudoVoigt1 => write!(f, "PseudoVoigt1"),
            PeakFunction::PseudoVoigt2 => write!(f, "PseudoVoigt2"),
        }
    }
}

/// Gaussian 面积因子 sqrt(π / (4 ln 2))
const GAUSS_AREA: f64 = 1.064_467_019_431_226_4;
/// Lorentzian 面积因子 π / 2
const LORENTZ_AREA: f64 = PI / 2.0;

/// 单位高度 Gaussian 及其对中心、宽度的导数
fn gauss(x: f64, c: f64, w: f64) -> (f64, f64, f64) {
    let t = x - c;
    let a = 4.0 * LN_2 / (w * w);
    let g = (-a * t * t).exp();
    (g, g * 2.0 * a * t, g * 2.0 * a * t * t / w)
}

/// 单位高度 Lorentzian 及其对中心、宽度的导数
fn lorentz(x: f64, c: f64, w: f64) -> (f64, f64, f64) {
    let t = x - c;
    let q = 1.0 + 4.0 * t * t / (w * w);
    let l = 1.0 / q;
    let q2 = q * q;
    (l, 8.0 * t / (w * w) / q2, 8.0 * t * t / (w * w * w) / q2)
}

impl PeakFunction {
    pub const ALL: [PeakFunction; 4] = [
        PeakFunction::Gaussian,
        PeakFunction::Lorentzian,
        PeakFunction::PseudoVoigt1,
        PeakFunction::PseudoVoigt2,
    ];

    /// 参数名
    pub fn par_names(&self) -> &'static [&'static str] {
        match self {
            PeakFunction::Gaussian | PeakFunction::Lorentzian => &["center", "fwhm", "height"],
            PeakFunction::PseudoVoigt1 => &["center", "fwhm", "height", "eta"],
            PeakFunction::PseudoVoigt2 => {
                &["center", "fwhm_gauss", "fwhm_lorentz", "height", "eta"]
            }
        }
    }

    /// 由中心、半高宽、峰高构造初始参数
    pub fn initial_parameters(&self, center: f64, fwhm: f64, height: f64) -> Vec<f64> {
        match self {
            PeakFunction::Gaussian | PeakFunction::Lorentzian => vec![center, fwhm, height],
            PeakFunction::PseudoVoigt1 => vec![center, fwhm, height, 0.5],
            PeakFunction::PseudoVoigt2 => vec![center, fwhm, fwhm, height, 0.5],
        }
    }

    /// 中心参数序号
    pub fn center_index(&self) -> usize {
        0
    }

    /// 峰高参数序号
    pub fn height_index(&self) -> usize {
        match self {
            PeakFunction::PseudoVoigt2 => 3,
            _ => 2,
        }
    }

    /// 等效半高宽
    pub fn fwhm(&self, p: &[f64]) -> f64 {
        match self {
            PeakFunction::PseudoVoigt2 => (1.0 - p[4]) * p[1] + p[4] * p[2],
            _ => p[1],
        }
    }

    /// 积分强度（峰面积）
    pub fn intensity(&self, p: &[f64]) -> f64 {
        match self {
            PeakFunction::Gaussian => p[2] * p[1] * GAUSS_AREA,
            PeakFunction::Lorentzian => p[2] * p[1] * LORENTZ_AREA,
            PeakFunction::PseudoVoigt1 => {
                p[2] * p[1] * ((1.0 - p[3]) * GAUSS_AREA + p[3] * LORENTZ_AREA)
            }
            PeakFunction::PseudoVoigt2 => {
                p[3] * ((1.0 - p[4]) * p[1] * GAUSS_AREA + p[4] * p[2] * LORENTZ_AREA)
            }
        }
    }
}

impl ParametricFunction for PeakFunction {
    fn par_count(&self) -> usize {
        self.par_names().len()
    }

    fn set_y(&self, p: &[f64], xs: &[f64], ys: &mut [f64]) {
        for (x, y) in xs.iter().zip(ys.iter_mut()) {
            *y = match self {
                PeakFunction::Gaussian => p[2] * gauss(*x, p[0], p[1]).0,
                PeakFunction::Lorentzian => p[2] * lorentz(*x, p[0], p[1]).0,
                PeakFunction::PseudoVoigt1 => {
                    let eta = p[3];
                    p[2] * ((1.0 - eta) * gauss(*x, p[0], p[1]).0
                        + eta * lorentz(*x, p[0], p[1]).0)
                }
                PeakFunction::PseudoVoigt2 => {
                    let eta = p[4];
                    p[3] * ((1.0 - eta) * gauss(*x, p[0], p[1]).0
                        + eta * lorentz(*x, p[0], p[2]).0)
                }
            };
        }
    }

    fn set_dy(&self, p: &[f64], xs: &[f64], jacobian: &mut DMatrix<f64>) {
        for (i, x) in xs.iter().enumerate() {
            match self {
                PeakFunction::Gaussian => {
                    let (g, gc, gw) = gauss(*x, p[0], p[1]);
                    jacobian[(i, 0)] = p[2] * gc;
                    jacobian[(i, 1)] = p[2] * gw;
                    jacobian[(i, 2)] = g;
                }
                PeakFunction::Lorentzian => {
                    let (l, lc, lw) = lorentz(*x, p[0], p[1]);
                    jacobian[(i, 0)] = p[2] * lc;
                    jacobian[(i, 1)] = p[2] * lw;
                    jacobian[(i, 2)] = l;
                }
                PeakFunction::PseudoVoigt1 => {
                    let (h, eta) = (p[2], p[3]);
                    let (g, gc, gw) = gauss(*x, p[0], p[1]);
                    let (l, lc, lw) = lorentz(*x, p[0], p[1]);
                    jacobian[(i, 0)] = h * ((1.0 - eta) * gc + eta * lc);
                    jacobian[(i, 1)] = h * ((1.0 - eta) * gw + eta * lw);
                    jacobian[(i, 2)] = (1.0 - eta) * g + eta * l;
                    jacobian[(i, 3)] = h * (l - g);
                }
                PeakFunction::PseudoVoigt2 => {
                    let (h, eta) = (p[3], p[4]);
                    let (g, gc, gw) = gauss(*x, p[0], p[1]);
                    let (l, lc, lw) = lorentz(*x, p[0], p[2]);
                    jacobian[(i, 0)] = h * ((1.0 - eta) * gc + eta * lc);
                    jacobian[(i, 1)] = h * (1.0 - eta) * gw;
                    jacobian[(i, 2)] = h * eta * lw;
                    jacobian[(i, 3)] = (1.0 - eta) * g + eta * l;
                    jacobian[(i, 4)] = h * (l - g);
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 统一分派
// ─────────────────────────────────────────────────────────────

/// 拟合所用函数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitFunction {
    Polynomial(Polynomial),
    Peak(PeakFunction),
}

impl ParametricFunction for FitFunction {
    fn par_count(&self) -> usize {
        match self {
            FitFunction::Polynomial(f) => f.par_count(),
            FitFunction::Peak(f) => f.par_count(),
        }
    }

    fn set_y(&self, p: &[f64], xs: &[f64], ys: &mut [f64]) {
        match self {
            FitFunction::Polynomial(f) => f.set_y(p, xs, ys),
            FitFunction::Peak(f) => f.set_y(p, xs, ys),
        }
    }

    fn set_dy(&self, p: &[f64], xs: &[f64], jacobian: &mut DMatrix<f64>) {
        match self {
            FitFunction::Polynomial(f) => f.set_dy(p, xs, jacobian),
            FitFunction::Peak(f) => f.set_dy(p, xs, jacobian),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 用中心差分检验解析 Jacobian
    fn check_jacobian<F: ParametricFunction>(f: &F, p: &[f64], xs: &[f64]) {
        let n = f.par_count();
        let mut jac = DMatrix::zeros(xs.len(), n);
        f.set_dy(p, xs, &mut jac);

        for k in 0..n {
            let h = 1e-6 * p[k].abs().max(1.0);
            let mut pp = p.to_vec();
            let mut pm = p.to_vec();
            pp[k] += h;
            pm[k] -= h;
            for (i, x) in xs.iter().enumerate() {
                let num = (f.y(&pp, *x) - f.y(&pm, *x)) / (2.0 * h);
                assert!(
                    (num - jac[(i, k)]).abs() < 1e-5 * (1.0 + num.abs()),
                    "param {} at x={}: numeric {} vs analytic {}",
                    k,
                    x,
                    num,
                    jac[(i, k)]
                );
            }
        }
    }

    #[test]
    fn test_polynomial_eval() {
        let p = Polynomial::new(2);
        assert_eq!(p.par_count(), 3);
        // 1 + 2x + 3x²
        assert!((p.y(&[1.0, 2.0, 3.0], 2.0) - 17.0).abs() < 1e-12);
        check_jacobian(&p, &[1.0, 2.0, 3.0], &[-1.0, 0.5, 3.0]);
    }

    #[test]
    fn test_gaussian_half_maximum() {
        let g = PeakFunction::Gaussian;
        let p = [10.0, 2.0, 5.0];
        assert!((g.y(&p, 10.0) - 5.0).abs() < 1e-12);
        assert!((g.y(&p, 11.0) - 2.5).abs() < 1e-12);
        assert!((g.y(&p, 9.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_lorentzian_half_maximum() {
        let l = PeakFunction::Lorentzian;
        let p = [0.0, 4.0, 8.0];
        assert!((l.y(&p, 2.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_peak_jacobians() {
        let xs = [8.7, 9.6, 10.0, 10.4, 12.1];
        check_jacobian(&PeakFunction::Gaussian, &[10.0, 1.5, 3.0], &xs);
        check_jacobian(&PeakFunction::Lorentzian, &[10.0, 1.5, 3.0], &xs);
        check_jacobian(&PeakFunction::PseudoVoigt1, &[10.0, 1.5, 3.0, 0.3], &xs);
        check_jacobian(
            &PeakFunction::PseudoVoigt2,
            &[10.0, 1.5, 2.0, 3.0, 0.6],
            &xs,
        );
    }

    #[test]
    fn test_intensity_matches_numeric_area() {
        for f in PeakFunction::ALL {
            let p = f.initial_parameters(0.0, 1.0, 2.0);
            // 数值积分（Lorentzian 尾部很长，积分区间取宽）
            let (a, b, n) = (-2000.0, 2000.0, 400_000);
            let dx = (b - a) / n as f64;
            let area: f64 = (0..n)
                .map(|i| f.y(&p, a + (i as f64 + 0.5) * dx) * dx)
                .sum();
            let expected = f.intensity(&p);
            assert!(
                (area - expected).abs() / expected < 1e-3,
                "{}: {} vs {}",
                f,
                area,
                expected
            );
        }
    }

    #[test]
    fn test_fit_function_dispatch() {
        let f = FitFunction::Peak(PeakFunction::PseudoVoigt2);
        assert_eq!(f.par_count(), 5);
        let poly = FitFunction::Polynomial(Polynomial::new(0));
        assert_eq!(poly.par_count(), 1);
        assert!((poly.y(&[4.0], 100.0) - 4.0).abs() < 1e-12);
    }
}
