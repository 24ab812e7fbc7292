//! # Levenberg–Marquardt 求解器
//!
//! 使用调用方提供的解析 Jacobian 的非线性最小二乘。每步在按
//! sqrt(diag(JᵀJ)) 缩放后的坐标中求解阻尼正规方程，参数量级相差很大
//! （例如高阶多项式系数）时仍保持良好条件。
//!
//! 收敛判据：缩放步长 ≤ `step_tolerance` × (缩放参数范数 + `step_tolerance`)，
//! 或残差平方和为 0。达到最大迭代次数仍未满足判据视为失败。
//! 收敛后协方差取 s²(JᵀJ)⁻¹，s² = SSR / max(m − n, 1)；矩阵奇异视为失败。
//!
//! ## 依赖关系
//! - 被 `fit/mod.rs` 使用
//! - 使用 `nalgebra` 做 Cholesky / LU 求解

use crate::fit::function::ParametricFunction;

use nalgebra::{DMatrix, DVector};

/// 求解器选项
#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    pub step_tolerance: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            step_tolerance: 1e-10,
        }
    }
}

/// 收敛解
#[derive(Debug, Clone)]
pub struct LmSolution {
    pub params: Vec<f64>,
    /// 参数标准误差
    pub errors: Vec<f64>,
    /// 残差平方和
    pub ssr: f64,
    pub iterations: usize,
}

fn residuals<F: ParametricFunction>(f: &F, p: &[f64], xs: &[f64], ys: &[f64]) -> DVector<f64> {
    let mut model = vec![0.0; xs.len()];
    f.set_y(p, xs, &mut model);
    DVector::from_iterator(xs.len(), model.iter().zip(ys).map(|(m, y)| m - y))
}

fn jacobian<F: ParametricFunction>(f: &F, p: &[f64], xs: &[f64]) -> DMatrix<f64> {
    let mut jac = DMatrix::zeros(xs.len(), f.par_count());
    f.set_dy(p, xs, &mut jac);
    jac
}

/// JᵀJ 的对角缩放因子；某参数对模型无影响时返回 None
fn scaling(a: &DMatrix<f64>) -> Option<DVector<f64>> {
    let d = DVector::from_iterator(a.nrows(), (0..a.nrows()).map(|i| a[(i, i)].sqrt()));
    d.iter().all(|v| v.is_finite() && *v > 0.0).then_some(d)
}

fn scaled(a: &DMatrix<f64>, d: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[(i, j)] / (d[i] * d[j]))
}

/// 缩放后的 JᵀJ 求逆；数值秩不足时返回 None
fn invert(s: DMatrix<f64>) -> Option<DMatrix<f64>> {
    let n = s.nrows();
    let eig = s.clone().symmetric_eigen();
    let max = eig.eigenvalues.max();
    let min = eig.eigenvalues.min();
    if !(min > f64::EPSILON * n as f64 * max) {
        return None;
    }
    s.try_inverse()
}

fn solve(s: DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    match s.clone().cholesky() {
        Some(ch) => Some(ch.solve(rhs)),
        None => s.lu().solve(rhs),
    }
}

/// 拟合 `f` 到 (xs, ys)；失败返回 None
pub fn levenberg_marquardt<F: ParametricFunction>(
    f: &F,
    xs: &[f64],
    ys: &[f64],
    initial: &[f64],
    options: LmOptions,
) -> Option<LmSolution> {
    let n = f.par_count();
    let m = xs.len();
    if n == 0 || m < n || initial.len() != n || ys.len() != m {
        return None;
    }

    let mut p = initial.to_vec();
    let mut r = residuals(f, &p, xs, ys);
    let mut cost = r.norm_squared();
    if !cost.is_finite() {
        return None;
    }

    let mut lambda = options.initial_lambda;
    let mut converged = false;
    let mut iterations = 0;
    let mut system: Option<(DMatrix<f64>, DVector<f64>, DVector<f64>)> = None;

    for iter in 0..options.max_iterations {
        iterations = iter + 1;
        if cost == 0.0 {
            converged = true;
            break;
        }

        // 参数变化后重建正规方程
        let (a, g, d) = match system.take() {
            Some(sys) => sys,
            None => {
                let jac = jacobian(f, &p, xs);
                let jt = jac.transpose();
                let a = &jt * &jac;
                let g = &jt * &r;
                let d = scaling(&a)?;
                (a, g, d)
            }
        };

        let mut s = scaled(&a, &d);
        for i in 0..n {
            s[(i, i)] += lambda;
        }
        let rhs = DVector::from_iterator(n, (0..n).map(|i| -g[i] / d[i]));

        let Some(z) = solve(s, &rhs) else {
            lambda *= options.lambda_up;
            system = Some((a, g, d));
            continue;
        };

        let dp_norm = DVector::from_iterator(n, (0..n).map(|i| d[i] * p[i])).norm();
        if z.norm() <= options.step_tolerance * (dp_norm + options.step_tolerance) {
            converged = true;
            break;
        }

        let candidate: Vec<f64> = (0..n).map(|i| p[i] + z[i] / d[i]).collect();
        let r_new = residuals(f, &candidate, xs, ys);
        let cost_new = r_new.norm_squared();

        if cost_new.is_finite() && cost_new < cost {
            p = candidate;
            r = r_new;
            cost = cost_new;
            lambda = (lambda * options.lambda_down).max(1e-15);
        } else {
            lambda *= options.lambda_up;
            if !lambda.is_finite() {
                break;
            }
            system = Some((a, g, d));
        }
    }

    if !converged {
        return None;
    }

    // 协方差 s²(JᵀJ)⁻¹，在缩放坐标中求逆
    let jac = jacobian(f, &p, xs);
    let a = jac.transpose() * &jac;
    let d = scaling(&a)?;
    let inv = invert(scaled(&a, &d))?;
    let s2 = cost / (m.saturating_sub(n)).max(1) as f64;

    let mut errors = Vec::with_capacity(n);
    for i in 0..n {
        let var = s2 * inv[(i, i)] / (d[i] * d[i]);
        if !var.is_finite() || var < 0.0 {
            return None;
        }
        errors.push(var.sqrt());
    }

    if p.iter().any(|v| !v.is_finite()) {
        return None;
    }

    Some(LmSolution {
        params: p,
        errors,
        ssr: cost,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::function::{PeakFunction, Polynomial};

    #[test]
    fn test_linear_exact() {
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 - 0.5 * x).collect();
        let sol =
            levenberg_marquardt(&Polynomial::new(1), &xs, &ys, &[0.0, 0.0], LmOptions::default())
                .unwrap();
        assert!((sol.params[0] - 3.0).abs() < 1e-8);
        assert!((sol.params[1] + 0.5).abs() < 1e-8);
        assert!(sol.ssr < 1e-12);
    }

    #[test]
    fn test_lorentzian_recovered() {
        let f = PeakFunction::Lorentzian;
        let truth = [45.0, 0.8, 200.0];
        let xs: Vec<f64> = (0..81).map(|i| 43.0 + i as f64 * 0.05).collect();
        let ys: Vec<f64> = xs.iter().map(|x| f.y(&truth, *x)).collect();

        let sol =
            levenberg_marquardt(&f, &xs, &ys, &[44.9, 1.0, 150.0], LmOptions::default()).unwrap();
        for (got, want) in sol.params.iter().zip(truth) {
            assert!((got - want).abs() / want < 1e-6);
        }
    }

    #[test]
    fn test_too_few_points() {
        let sol = levenberg_marquardt(
            &PeakFunction::Gaussian,
            &[1.0, 2.0],
            &[1.0, 1.0],
            &[1.5, 1.0, 1.0],
            LmOptions::default(),
        );
        assert!(sol.is_none());
    }

    #[test]
    fn test_singular_jacobian_fails() {
        // 所有 x 为 0：一次多项式的斜率无法确定
        let xs = [0.0, 0.0, 0.0];
        let ys = [1.0, 1.1, 0.9];
        let sol =
            levenberg_marquardt(&Polynomial::new(1), &xs, &ys, &[0.0, 0.0], LmOptions::default());
        assert!(sol.is_none());
    }

    #[test]
    fn test_errors_scale_with_noise() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, x)| 1.0 + 2.0 * x + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let sol =
            levenberg_marquardt(&Polynomial::new(1), &xs, &ys, &[0.0, 0.0], LmOptions::default())
                .unwrap();
        assert!(sol.errors.iter().all(|e| *e > 0.0 && *e < 0.1));
    }
}
