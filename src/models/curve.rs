//! # 一维曲线
//!
//! 强度-角度曲线，x 严格按加入顺序保存（衍射图中为递增的 2θ）。
//!
//! ## 依赖关系
//! - 被 `calc/dfgram.rs`, `fit/`, `export/` 使用

use crate::models::{Range, Ranges};

/// 一维曲线 (x, y)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curve {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Curve {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从点列构造
    pub fn from_points<I: IntoIterator<Item = (f64, f64)>>(points: I) -> Self {
        let mut c = Self::new();
        for (x, y) in points {
            c.push(x, y);
        }
        c
    }

    pub fn push(&mut self, x: f64, y: f64) {
        self.xs.push(x);
        self.ys.push(y);
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xs.iter().cloned().zip(self.ys.iter().cloned())
    }

    /// 落在区间内的子曲线
    pub fn intersect(&self, range: &Range) -> Curve {
        Curve::from_points(self.points().filter(|(x, _)| range.contains(*x)))
    }

    /// 落在区间并集内的子曲线
    pub fn intersect_ranges(&self, ranges: &Ranges) -> Curve {
        Curve::from_points(self.points().filter(|(x, _)| ranges.contains(*x)))
    }

    /// 每点减去 f(x)
    pub fn subtract<F: Fn(f64) -> f64>(&self, f: F) -> Curve {
        Curve::from_points(self.points().map(|(x, y)| (x, y - f(x))))
    }

    /// 每点 y 乘以常数
    pub fn scaled(&self, factor: f64) -> Curve {
        Curve::from_points(self.points().map(|(x, y)| (x, y * factor)))
    }

    pub fn range_x(&self) -> Range {
        Range::spanning(self.xs.iter().cloned())
    }

    pub fn range_y(&self) -> Range {
        Range::spanning(self.ys.iter().cloned())
    }

    /// y 最大值所在的点序号
    pub fn idx_max(&self) -> Option<usize> {
        self.ys
            .iter()
            .enumerate()
            .filter(|(_, y)| y.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}
