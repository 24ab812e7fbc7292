//! # 区间与区间集合
//!
//! `Range` 为闭区间 [min, max]；`Ranges` 为有序、互不重叠的区间并集，
//! 用于基线拟合范围。
//!
//! ## 依赖关系
//! - 被 `models/curve.rs`, `pars/`, `calc/` 使用

use serde::{Deserialize, Serialize};

/// 闭区间
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    /// 创建区间（自动排序端点）
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// 空区间（min > max）
    pub fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// 包含所有给定值的最小区间
    pub fn spanning<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut r = Self::empty();
        for v in values {
            r.extend_to(v);
        }
        r
    }

    pub fn is_empty(&self) -> bool {
        !(self.min <= self.max)
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }

    /// 扩展以包含 v
    pub fn extend_to(&mut self, v: f64) {
        if v < self.min {
            self.min = v;
        }
        if v > self.max {
            self.max = v;
        }
    }

    /// 两区间的并包络
    pub fn union(&self, other: &Range) -> Range {
        Range {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn intersects(&self, other: &Range) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    /// 两区间的交集（可能为空）
    pub fn intersect(&self, other: &Range) -> Range {
        Range {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    /// 第 i 段（共 n 段）等分子区间；最后一段的上端点就是 `max`
    pub fn slice(&self, i: usize, n: usize) -> Range {
        let n = n.max(1);
        let step = self.width() / n as f64;
        let max = if i + 1 >= n {
            self.max
        } else {
            self.min + step * (i + 1) as f64
        };
        Range {
            min: self.min + step * i as f64,
            max,
        }
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}-{:.3}", self.min, self.max)
    }
}

/// 有序、互不重叠的区间集合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranges {
    ranges: Vec<Range>,
}

impl Ranges {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从任意区间列表构造（重叠区间被合并）
    pub fn from_ranges<I: IntoIterator<Item = Range>>(ranges: I) -> Self {
        let mut out = Self::new();
        for r in ranges {
            out.add(r);
        }
        out
    }

    /// 加入一个区间，与重叠的已有区间合并
    pub fn add(&mut self, range: Range) {
        if range.is_empty() {
            return;
        }
        let mut merged = range;
        self.ranges.retain(|r| {
            if r.intersects(&merged) {
                merged = merged.union(r);
                false
            } else {
                true
            }
        });
        let pos = self
            .ranges
            .iter()
            .position(|r| r.min > merged.min)
            .unwrap_or(self.ranges.len());
        self.ranges.insert(pos, merged);
    }

    /// 删除第 i 个区间
    pub fn remove(&mut self, i: usize) -> Option<Range> {
        if i < self.ranges.len() {
            Some(self.ranges.remove(i))
        } else {
            None
        }
    }

    /// 包含 x 的区间序号
    pub fn index_of(&self, x: f64) -> Option<usize> {
        self.ranges.iter().position(|r| r.contains(x))
    }

    /// 是否有任一区间包含 x
    pub fn contains(&self, x: f64) -> bool {
        self.index_of(x).is_some()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Range> {
        self.ranges.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_new_sorts_endpoints() {
        let r = Range::new(5.0, 1.0);
        assert_eq!((r.min, r.max), (1.0, 5.0));
        assert!(r.contains(1.0) && r.contains(5.0));
        assert!(!r.contains(5.1));
    }

    #[test]
    fn test_range_empty_and_spanning() {
        assert!(Range::empty().is_empty());
        assert_eq!(Range::empty().width(), 0.0);
        let r = Range::spanning([3.0, -1.0, 2.0]);
        assert_eq!((r.min, r.max), (-1.0, 3.0));
    }

    #[test]
    fn test_range_slice() {
        let r = Range::new(0.0, 90.0);
        let s = r.slice(2, 3);
        assert!((s.min - 60.0).abs() < 1e-12);
        assert!((s.max - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_last_slice_ends_exactly_at_max() {
        // 0.1 * 3 舍入后小于 0.3
        let r = Range::new(0.0, 0.3);
        assert_eq!(r.slice(2, 3).max, 0.3);
        assert_eq!(r.slice(0, 3).max, r.slice(1, 3).min);
    }

    #[test]
    fn test_ranges_merge_overlaps() {
        let mut rs = Ranges::new();
        rs.add(Range::new(10.0, 20.0));
        rs.add(Range::new(30.0, 40.0));
        rs.add(Range::new(0.0, 5.0));
        assert_eq!(rs.len(), 3);

        rs.add(Range::new(15.0, 35.0));
        assert_eq!(rs.len(), 2);
        let all: Vec<Range> = rs.iter().cloned().collect();
        assert_eq!(all[0], Range::new(0.0, 5.0));
        assert_eq!(all[1], Range::new(10.0, 40.0));
    }

    #[test]
    fn test_ranges_lookup_and_remove() {
        let mut rs = Ranges::from_ranges([Range::new(1.0, 2.0), Range::new(5.0, 6.0)]);
        assert_eq!(rs.index_of(5.5), Some(1));
        assert!(!rs.contains(3.0));
        assert_eq!(rs.remove(0), Some(Range::new(1.0, 2.0)));
        assert_eq!(rs.remove(9), None);
        assert_eq!(rs.len(), 1);
    }
}
