//! # 角度映射
//!
//! 对给定的探测器几何与探测器臂角 `mid_tth`，预先计算每个原始像素对应的
//! 散射角 2θ 与方位角 γ（度）。被裁剪或几何上无意义的像素标记为无效，
//! 不参与任何分箱。
//!
//! ## 几何
//! 探测器平面垂直于样品到探测器中心的连线，该连线与入射束夹角 `mid_tth`。
//! 像素在探测器平面内的位置 (u, v)（u 沿 2θ 增大方向，v 向上）：
//!
//! ```text
//! P = D·(sin t, 0, cos t) + u·(cos t, 0, −sin t) + v·(0, 1, 0)
//! 2θ = acos(P_z / |P|),  γ = atan2(P_y, P_x)
//! ```
//!
//! ## 依赖关系
//! - 被 `calc/dfgram.rs`, `session.rs` 使用
//! - 使用 `pars/detector.rs`

use crate::models::{Range, Size2d};
use crate::pars::{GammaSector, Geometry, ImageCut, ImageTransform};

/// 单个像素的散射方向（度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterAngles {
    pub tth: f64,
    pub gamma: f64,
}

/// 每个原始像素的 (2θ, γ)，按行存储；None 表示无效像素
#[derive(Debug, Clone)]
pub struct AngleMap {
    size: Size2d,
    mid_tth: f64,
    pixel_angle: f64,
    angles: Vec<Option<ScatterAngles>>,
    tth_range: Range,
    gamma_range: Range,
}

impl AngleMap {
    pub fn new(
        geometry: &Geometry,
        transform: &ImageTransform,
        cut: &ImageCut,
        size: Size2d,
        mid_tth: f64,
    ) -> Self {
        let ds = transform.detector_size(size);
        let (t_sin, t_cos) = mid_tth.to_radians().sin_cos();
        let d = geometry.detector_distance;
        let pix = geometry.pixel_size;
        let (off_x, off_y) = (geometry.beam_offset.0 as f64, geometry.beam_offset.1 as f64);

        let mut angles = Vec::with_capacity(size.count());
        let mut tth_range = Range::empty();
        let mut gamma_range = Range::empty();

        for y in 0..size.h {
            for x in 0..size.w {
                let (dx, dy) = transform.apply(x, y, size);
                if !cut.contains(dx, dy, ds) {
                    angles.push(None);
                    continue;
                }

                let u = (dx as f64 + 0.5 - ds.w as f64 / 2.0 - off_x) * pix;
                let v = (ds.h as f64 / 2.0 + off_y - dy as f64 - 0.5) * pix;

                let px = d * t_sin + u * t_cos;
                let py = v;
                let pz = d * t_cos - u * t_sin;
                let norm = (px * px + py * py + pz * pz).sqrt();

                let tth = (pz / norm).acos().to_degrees();
                let gamma = py.atan2(px).to_degrees();
                if tth.is_finite() && gamma.is_finite() {
                    tth_range.extend_to(tth);
                    gamma_range.extend_to(gamma);
                    angles.push(Some(ScatterAngles { tth, gamma }));
                } else {
                    angles.push(None);
                }
            }
        }

        Self {
            size,
            mid_tth,
            pixel_angle: geometry.pixel_angle(),
            angles,
            tth_range,
            gamma_range,
        }
    }

    /// 原始图像尺寸
    pub fn size(&self) -> Size2d {
        self.size
    }

    pub fn mid_tth(&self) -> f64 {
        self.mid_tth
    }

    /// 束心处一个像素的角宽（度）
    pub fn pixel_angle(&self) -> f64 {
        self.pixel_angle
    }

    /// 第 i 个原始像素（按行）
    pub fn at(&self, i: usize) -> Option<ScatterAngles> {
        self.angles[i]
    }

    pub fn at_xy(&self, x: usize, y: usize) -> Option<ScatterAngles> {
        self.angles[y * self.size.w + x]
    }

    pub fn angles(&self) -> &[Option<ScatterAngles>] {
        &self.angles
    }

    pub fn valid_count(&self) -> usize {
        self.angles.iter().filter(|a| a.is_some()).count()
    }

    /// 全部有效像素的 2θ 范围
    pub fn tth_range(&self) -> Range {
        self.tth_range
    }

    /// 全部有效像素的 γ 范围
    pub fn gamma_range(&self) -> Range {
        self.gamma_range
    }

    /// γ 落在扇区内的有效像素的 2θ 范围
    pub fn tth_range_in(&self, sector: &GammaSector) -> Range {
        Range::spanning(
            self.angles
                .iter()
                .flatten()
                .filter(|a| sector.contains(a.gamma))
                .map(|a| a.tth),
        )
    }

    /// γ 落在扇区内的有效像素数
    pub fn count_in(&self, sector: &GammaSector) -> usize {
        self.angles
            .iter()
            .flatten()
            .filter(|a| sector.contains(a.gamma))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pars::GammaSelection;

    fn map(size: Size2d, mid_tth: f64) -> AngleMap {
        AngleMap::new(
            &Geometry::default(),
            &ImageTransform::default(),
            &ImageCut::default(),
            size,
            mid_tth,
        )
    }

    #[test]
    fn test_center_pixel_at_mid_tth() {
        let m = map(Size2d::new(5, 5), 35.0);
        let c = m.at_xy(2, 2).unwrap();
        assert!((c.tth - 35.0).abs() < 1e-9);
        assert!(c.gamma.abs() < 1e-9);
        assert_eq!(m.valid_count(), 25);
    }

    #[test]
    fn test_tth_increases_to_the_right() {
        let m = map(Size2d::new(5, 3), 30.0);
        let left = m.at_xy(0, 1).unwrap().tth;
        let right = m.at_xy(4, 1).unwrap().tth;
        assert!(left < 30.0 && right > 30.0);
        assert!(m.tth_range().contains(30.0));
    }

    #[test]
    fn test_straight_through_symmetry() {
        // 2θ = 0 时探测器垂直于入射束，左右、上下对称
        let m = map(Size2d::new(3, 3), 0.0);
        let l = m.at_xy(0, 1).unwrap();
        let r = m.at_xy(2, 1).unwrap();
        let up = m.at_xy(1, 0).unwrap();
        assert!((l.tth - r.tth).abs() < 1e-12);
        assert!((r.gamma - 0.0).abs() < 1e-9);
        assert!((up.gamma - 90.0).abs() < 1e-9);
        assert!((l.gamma.abs() - 180.0).abs() < 1e-9);
        // 1 mm / 1035 mm
        assert!((r.tth - (1.0f64 / 1035.0).atan().to_degrees()).abs() < 1e-9);
    }

    #[test]
    fn test_cut_pixels_invalid() {
        let m = AngleMap::new(
            &Geometry::default(),
            &ImageTransform::default(),
            &ImageCut::new(1, 0, 0, 1),
            Size2d::new(4, 3),
            20.0,
        );
        assert!(m.at_xy(0, 0).is_none());
        assert!(m.at_xy(1, 2).is_none());
        assert!(m.at_xy(1, 1).is_some());
        assert_eq!(m.valid_count(), 3 * 2);
    }

    #[test]
    fn test_tth_range_in_gamma_sector() {
        let m = map(Size2d::new(11, 11), 0.0);
        let upper = m.tth_range_in(&GammaSector::whole(Range::new(45.0, 135.0)));
        assert!(!upper.is_empty());
        assert!(upper.max <= m.tth_range().max);
        assert!(m
            .tth_range_in(&GammaSector::whole(Range::new(1000.0, 1001.0)))
            .is_empty());
    }

    #[test]
    fn test_gamma_sectors_count_every_pixel_once() {
        for (w, h) in [(9, 9), (8, 6), (5, 7), (16, 3)] {
            for mid_tth in [0.0, 0.02, 15.0, 90.0] {
                let m = map(Size2d::new(w, h), mid_tth);
                for slices in 1..=7 {
                    let sel = GammaSelection {
                        slices,
                        slice: 0,
                        range: None,
                    };
                    let total: usize = (0..slices)
                        .map(|i| m.count_in(&sel.sector(&m.gamma_range(), i)))
                        .sum();
                    assert_eq!(
                        total,
                        m.valid_count(),
                        "{}x{} at 2theta {} with {} slices",
                        w,
                        h,
                        mid_tth,
                        slices
                    );
                }
            }
        }
    }

    #[test]
    fn test_rotation_transposes_detector() {
        let m = AngleMap::new(
            &Geometry::default(),
            &ImageTransform::new(1, false),
            &ImageCut::default(),
            Size2d::new(5, 1),
            10.0,
        );
        // 旋转后成为竖直的一列：2θ 相同，γ 上下对称
        let a = m.at_xy(0, 0).unwrap();
        let b = m.at_xy(4, 0).unwrap();
        assert!((a.tth - b.tth).abs() < 1e-9);
        assert!((a.gamma + b.gamma).abs() < 1e-9);
    }
}
