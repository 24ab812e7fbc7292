//! # 探测器图像
//!
//! 固定宽×高的稠密二维强度数组，按行存储（索引 `y * w + x`）。
//!
//! ## 依赖关系
//! - 被 `models/measurement.rs`, `data/`, `calc/` 使用

use crate::error::{DfredError, Result};
use crate::models::Range;

use serde::{Deserialize, Serialize};

/// 图像尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size2d {
    pub w: usize,
    pub h: usize,
}

impl Size2d {
    pub fn new(w: usize, h: usize) -> Self {
        Self { w, h }
    }

    /// 像素总数
    pub fn count(&self) -> usize {
        self.w * self.h
    }

    /// 宽高互换
    pub fn transposed(&self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }
}

impl std::fmt::Display for Size2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// 二维强度图像
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    size: Size2d,
    intens: Vec<f64>,
}

impl Image {
    /// 从强度缓冲区创建，长度必须等于 w*h
    pub fn new(size: Size2d, intens: Vec<f64>) -> Result<Self> {
        if size.count() == 0 {
            return Err(DfredError::InvalidArgument(format!(
                "image must not be empty ({})",
                size
            )));
        }
        if intens.len() != size.count() {
            return Err(DfredError::InvalidArgument(format!(
                "image buffer has {} values, {} expected for {}",
                intens.len(),
                size.count(),
                size
            )));
        }
        Ok(Self { size, intens })
    }

    /// 全部为同一值的图像
    pub fn filled(size: Size2d, value: f64) -> Self {
        Self {
            size,
            intens: vec![value; size.count()],
        }
    }

    pub fn size(&self) -> Size2d {
        self.size
    }

    /// 按行存储的强度
    pub fn intens(&self) -> &[f64] {
        &self.intens
    }

    /// 像素 (x, y) 的强度
    pub fn at(&self, x: usize, y: usize) -> f64 {
        self.intens[y * self.size.w + x]
    }

    /// 强度范围（忽略非有限值）
    pub fn range_inten(&self) -> Range {
        Range::spanning(self.intens.iter().cloned().filter(|v| v.is_finite()))
    }

    /// 逐像素累加另一幅同尺寸图像
    pub fn add_assign(&mut self, other: &Image) {
        assert_eq!(
            self.size, other.size,
            "cannot add images of different size"
        );
        for (a, b) in self.intens.iter_mut().zip(&other.intens) {
            *a += *b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_new_checks_length() {
        assert!(Image::new(Size2d::new(2, 3), vec![0.0; 6]).is_ok());
        assert!(Image::new(Size2d::new(2, 3), vec![0.0; 5]).is_err());
        assert!(Image::new(Size2d::new(0, 3), vec![]).is_err());
    }

    #[test]
    fn test_image_at_row_major() {
        let img = Image::new(Size2d::new(3, 2), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(img.at(2, 0), 2.0);
        assert_eq!(img.at(0, 1), 3.0);
        let r = img.range_inten();
        assert_eq!((r.min, r.max), (0.0, 5.0));
    }

    #[test]
    fn test_image_add_assign() {
        let mut a = Image::filled(Size2d::new(2, 2), 1.0);
        let b = Image::filled(Size2d::new(2, 2), 2.5);
        a.add_assign(&b);
        assert!(a.intens().iter().all(|v| (*v - 3.5).abs() < 1e-12));
    }
}
