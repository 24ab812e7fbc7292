//! # 原始峰统计
//!
//! 不做形状拟合，直接从窗口内数据得到极值统计：点数、峰位、峰高、
//! 半高宽（半高处线性插值）与积分强度（梯形法）。用作拟合初值，
//! 拟合失败或峰形为 `Raw` 时作为结果。
//!
//! ## 依赖关系
//! - 被 `fit/mod.rs`, `calc/dfgram.rs`, `calc/peak_info.rs` 使用

use crate::models::Curve;

use serde::Serialize;

/// 原始峰统计
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawOutcome {
    pub count: usize,
    pub center: f64,
    pub height: f64,
    pub fwhm: f64,
    pub intensity: f64,
}

impl RawOutcome {
    /// 空窗口的统计
    pub fn empty() -> Self {
        Self {
            count: 0,
            center: f64::NAN,
            height: f64::NAN,
            fwhm: f64::NAN,
            intensity: f64::NAN,
        }
    }

    pub fn from_curve(curve: &Curve) -> Self {
        let Some(imax) = curve.idx_max() else {
            return Self::empty();
        };
        let xs = curve.xs();
        let ys = curve.ys();
        let height = ys[imax];
        let half = height / 2.0;

        // 线性插值求半高处的 x
        let cross = |i: usize, j: usize| {
            let (x0, y0, x1, y1) = (xs[i], ys[i], xs[j], ys[j]);
            if y1 == y0 {
                x0
            } else {
                x0 + (half - y0) * (x1 - x0) / (y1 - y0)
            }
        };

        let left = (0..imax)
            .rev()
            .find(|&i| ys[i] <= half)
            .map_or(xs[0], |i| cross(i, i + 1));
        let right = (imax + 1..ys.len())
            .find(|&i| ys[i] <= half)
            .map_or(xs[xs.len() - 1], |i| cross(i - 1, i));

        let intensity = xs
            .windows(2)
            .zip(ys.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
            .sum();

        Self {
            count: curve.len(),
            center: xs[imax],
            height,
            fwhm: right - left,
            intensity,
        }
    }
}
