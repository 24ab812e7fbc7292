//! # 平场校正集
//!
//! 校正文件的所有测量逐像素求和成一幅参考图像。像素校正因子为
//! `mean / corr[p]`，`mean` 取有效像素（未被裁剪且为正的有限值）的平均。
//! 零、负或非有限的校正像素在分箱中被排除，不做除法。
//!
//! ## 依赖关系
//! - 被 `session.rs`, `calc/dfgram.rs` 使用
//! - 使用 `data/dataset.rs`, `pars/detector.rs`

use crate::data::{Datafile, Sequence};
use crate::error::{DfredError, Result};
use crate::models::{Image, Size2d};
use crate::pars::{ImageCut, ImageTransform};

/// 平场校正集
#[derive(Debug, Clone)]
pub struct Corrset {
    name: String,
    measurement_count: usize,
    image: Image,
}

impl Corrset {
    pub fn new(file: &Datafile) -> Self {
        let seq = Sequence::new(file.measurements());
        Self {
            name: file.name().to_string(),
            measurement_count: seq.count(),
            image: seq.summed_image(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn measurement_count(&self) -> usize {
        self.measurement_count
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn image_size(&self) -> Size2d {
        self.image.size()
    }

    /// 按原始像素顺序的校正因子，被排除的像素为 NaN
    pub fn factors(&self, cut: &ImageCut, transform: &ImageTransform) -> Result<Vec<f64>> {
        let size = self.image.size();
        let detector_size = transform.detector_size(size);

        let mut usable = vec![false; size.count()];
        let (mut sum, mut count) = (0.0, 0usize);
        let mut skipped = 0usize;
        for y in 0..size.h {
            for x in 0..size.w {
                let (dx, dy) = transform.apply(x, y, size);
                if !cut.contains(dx, dy, detector_size) {
                    continue;
                }
                let v = self.image.at(x, y);
                if v.is_finite() && v > 0.0 {
                    usable[y * size.w + x] = true;
                    sum += v;
                    count += 1;
                } else {
                    skipped += 1;
                }
            }
        }

        if count == 0 {
            return Err(DfredError::CorrectionError(format!(
                "correction image '{}' has no positive pixels",
                self.name
            )));
        }
        if skipped > 0 {
            log::warn!(
                "correction image '{}': {} pixels are zero or invalid and will be excluded",
                self.name,
                skipped
            );
        }

        let mean = sum / count as f64;
        Ok(self
            .image
            .intens()
            .iter()
            .zip(&usable)
            .map(|(v, ok)| if *ok { mean / v } else { f64::NAN })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Measurement, Metadata};

    fn corr_file(values: Vec<f64>) -> Datafile {
        let size = Size2d::new(2, 2);
        let m = Measurement::new(Metadata::new(), Image::new(size, values).unwrap());
        Datafile::new("corr", vec![m.clone(), m]).unwrap()
    }

    #[test]
    fn test_corrset_sums_members() {
        let c = Corrset::new(&corr_file(vec![1.0, 2.0, 3.0, 4.0]));
        assert_eq!(c.measurement_count(), 2);
        assert_eq!(c.image().intens(), &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_corrset_factors_exclude_bad_pixels() {
        let c = Corrset::new(&corr_file(vec![1.0, 0.0, 3.0, f64::NAN]));
        let f = c
            .factors(&ImageCut::default(), &ImageTransform::default())
            .unwrap();
        // 有效像素 2 和 6，平均 4
        assert!((f[0] - 2.0).abs() < 1e-12);
        assert!(f[1].is_nan());
        assert!((f[2] - 4.0 / 6.0).abs() < 1e-12);
        assert!(f[3].is_nan());
    }

    #[test]
    fn test_corrset_factors_respect_cut() {
        let c = Corrset::new(&corr_file(vec![1.0, 2.0, 3.0, 4.0]));
        // 去掉左列
        let f = c
            .factors(&ImageCut::new(1, 0, 0, 0), &ImageTransform::default())
            .unwrap();
        assert!(f[0].is_nan() && f[2].is_nan());
        assert!((f[1] - 6.0 / 4.0).abs() < 1e-12);
        assert!((f[3] - 6.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_corrset_all_zero_is_error() {
        let c = Corrset::new(&corr_file(vec![0.0; 4]));
        assert!(matches!(
            c.factors(&ImageCut::default(), &ImageTransform::default()),
            Err(DfredError::CorrectionError(_))
        ));
    }
}
