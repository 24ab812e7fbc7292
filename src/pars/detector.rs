//! # 探测器几何参数
//!
//! - `Geometry`: 样品-探测器距离、像素尺寸、束心像素偏移
//! - `ImageTransform`: 图像旋转（90° 的整数倍）与镜像
//! - `ImageCut`: 探测器坐标系下四边裁剪的像素数
//!
//! 这些参数任何一项改变，角度映射缓存都必须失效。
//!
//! ## 依赖关系
//! - 被 `calc/angle_map.rs`, `session.rs` 使用
//! - 使用 `serde` 派生序列化

use crate::error::{DfredError, Result};
use crate::models::Size2d;

use serde::{Deserialize, Serialize};

/// 探测器几何
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    /// 样品到探测器中心的距离（mm）
    pub detector_distance: f64,
    /// 像素边长（mm）
    pub pixel_size: f64,
    /// 束心相对图像中心的偏移（像素，x 向右、y 向下）
    pub beam_offset: (i32, i32),
}

impl Geometry {
    pub const MIN_DETECTOR_DISTANCE: f64 = 10.0;
    pub const MIN_PIXEL_SIZE: f64 = 0.1;
    pub const DEF_DETECTOR_DISTANCE: f64 = 1035.0;
    pub const DEF_PIXEL_SIZE: f64 = 1.0;

    /// 检查参数是否在物理合理范围内
    pub fn validate(&self) -> Result<()> {
        if !(self.detector_distance >= Self::MIN_DETECTOR_DISTANCE) {
            return Err(DfredError::InvalidArgument(format!(
                "detector distance {} mm below minimum {} mm",
                self.detector_distance,
                Self::MIN_DETECTOR_DISTANCE
            )));
        }
        if !(self.pixel_size >= Self::MIN_PIXEL_SIZE) {
            return Err(DfredError::InvalidArgument(format!(
                "pixel size {} mm below minimum {} mm",
                self.pixel_size,
                Self::MIN_PIXEL_SIZE
            )));
        }
        Ok(())
    }

    /// 束心处一个像素对应的角度（度）
    pub fn pixel_angle(&self) -> f64 {
        (self.pixel_size / self.detector_distance).atan().to_degrees()
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            detector_distance: Self::DEF_DETECTOR_DISTANCE,
            pixel_size: Self::DEF_PIXEL_SIZE,
            beam_offset: (0, 0),
        }
    }
}

/// 图像变换：先水平镜像，再顺时针旋转 `quarter_turns` 个 90°
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageTransform {
    /// 顺时针旋转次数（0..=3）
    pub quarter_turns: u8,
    /// 水平镜像
    pub mirror: bool,
}

impl ImageTransform {
    pub fn new(quarter_turns: u8, mirror: bool) -> Self {
        Self {
            quarter_turns: quarter_turns % 4,
            mirror,
        }
    }

    /// 再顺时针旋转 90°
    pub fn rotated(&self) -> Self {
        Self::new(self.quarter_turns + 1, self.mirror)
    }

    /// 变换后（探测器坐标系）的图像尺寸
    pub fn detector_size(&self, size: Size2d) -> Size2d {
        if self.quarter_turns % 2 == 1 {
            size.transposed()
        } else {
            size
        }
    }

    /// 原始像素 (x, y) 在探测器坐标系中的位置
    pub fn apply(&self, x: usize, y: usize, size: Size2d) -> (usize, usize) {
        let (mut x, mut y) = (x, y);
        let mut s = size;
        if self.mirror {
            x = s.w - 1 - x;
        }
        for _ in 0..(self.quarter_turns % 4) {
            // 顺时针 90°: (x, y) -> (h-1-y, x)
            let nx = s.h - 1 - y;
            y = x;
            x = nx;
            s = s.transposed();
        }
        (x, y)
    }
}

/// 探测器坐标系下的四边裁剪（像素）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageCut {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

impl ImageCut {
    pub fn new(left: usize, top: usize, right: usize, bottom: usize) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// 四边相同的裁剪
    pub fn uniform(margin: usize) -> Self {
        Self::new(margin, margin, margin, margin)
    }

    /// 裁剪后至少保留一个像素
    pub fn validate(&self, detector_size: Size2d) -> Result<()> {
        if self.left + self.right >= detector_size.w || self.top + self.bottom >= detector_size.h {
            return Err(DfredError::InvalidArgument(format!(
                "image cut {}/{}/{}/{} (left/top/right/bottom) leaves no pixels of {}",
                self.left, self.top, self.right, self.bottom, detector_size
            )));
        }
        Ok(())
    }

    /// 探测器坐标 (x, y) 是否保留
    pub fn contains(&self, x: usize, y: usize, detector_size: Size2d) -> bool {
        x >= self.left
            && y >= self.top
            && x + self.right < detector_size.w
            && y + self.bottom < detector_size.h
    }

    /// 保留的像素数
    pub fn count(&self, detector_size: Size2d) -> usize {
        let w = detector_size.w.saturating_sub(self.left + self.right);
        let h = detector_size.h.saturating_sub(self.top + self.bottom);
        w * h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_validate() {
        assert!(Geometry::default().validate().is_ok());
        let mut g = Geometry::default();
        g.detector_distance = 1.0;
        assert!(g.validate().is_err());
        g.detector_distance = 500.0;
        g.pixel_size = f64::NAN;
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_transform_identity() {
        let t = ImageTransform::default();
        let s = Size2d::new(4, 3);
        assert_eq!(t.apply(1, 2, s), (1, 2));
        assert_eq!(t.detector_size(s), s);
    }

    #[test]
    fn test_transform_rotate_once() {
        let t = ImageTransform::new(1, false);
        let s = Size2d::new(4, 3);
        // 左上角转到右上角
        assert_eq!(t.apply(0, 0, s), (2, 0));
        // 右上角转到右下角
        assert_eq!(t.apply(3, 0, s), (2, 3));
        assert_eq!(t.detector_size(s), Size2d::new(3, 4));
    }

    #[test]
    fn test_transform_full_turn_and_mirror() {
        let s = Size2d::new(5, 2);
        let full = ImageTransform::new(4, false);
        assert_eq!(full.apply(3, 1, s), (3, 1));

        let mirror = ImageTransform::new(0, true);
        assert_eq!(mirror.apply(0, 1, s), (4, 1));
        assert_eq!(ImageTransform::new(3, false).rotated().quarter_turns, 0);
    }

    #[test]
    fn test_cut_contains_and_validate() {
        let s = Size2d::new(10, 8);
        let cut = ImageCut::new(1, 2, 3, 0);
        assert!(cut.validate(s).is_ok());
        assert!(!cut.contains(0, 5, s));
        assert!(cut.contains(1, 2, s));
        assert!(cut.contains(6, 7, s));
        assert!(!cut.contains(7, 7, s));
        assert_eq!(cut.count(s), 6 * 6);

        assert!(ImageCut::uniform(5).validate(s).is_err());
    }
}
