//! # 极图
//!
//! 把每个 Cluster 的峰参数（按极图角 α/β 定位）组成极图。插值关闭时
//! 直接使用测量点；打开时在规则网格 α ∈ [0, 90]、β ∈ [0, 360) 上：
//! 1. α ≤ `avg_alpha_max` 的网格点先取 `avg_radius` 内测量点的平均，
//!    只保留强度居中的 `threshold`% 个点
//! 2. 否则（或半径内没有点）在 `idw_radius` 内做反距离平方加权
//! 3. 仍无测量点时该网格点的值为 NaN
//!
//! 距离为两方向单位矢量的夹角。
//!
//! ## 依赖关系
//! - 被 `session.rs`, `export/polefig.rs` 使用
//! - 使用 `calc/peak_info.rs`, `pars/interpol.rs`
//! - 使用 `nalgebra` 计算方向夹角

use crate::calc::PeakInfo;
use crate::pars::InterpolParams;

use nalgebra::Vector3;
use serde::Serialize;

/// 极图上一点
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolePoint {
    pub alpha: f64,
    pub beta: f64,
    pub center: f64,
    pub fwhm: f64,
    pub intensity: f64,
}

impl PolePoint {
    pub fn from_info(info: &PeakInfo) -> Self {
        Self {
            alpha: info.alpha,
            beta: info.beta,
            center: info.center.value,
            fwhm: info.fwhm.value,
            intensity: info.intensity.value,
        }
    }

    fn missing(alpha: f64, beta: f64) -> Self {
        Self {
            alpha,
            beta,
            center: f64::NAN,
            fwhm: f64::NAN,
            intensity: f64::NAN,
        }
    }

    /// 没有任何测量点可用
    pub fn is_missing(&self) -> bool {
        self.intensity.is_nan()
    }

    fn direction(&self) -> Vector3<f64> {
        direction(self.alpha, self.beta)
    }
}

fn direction(alpha: f64, beta: f64) -> Vector3<f64> {
    let (a, b) = (alpha.to_radians(), beta.to_radians());
    Vector3::new(a.sin() * b.cos(), a.sin() * b.sin(), a.cos())
}

/// 单位矢量夹角（度）；同一方向严格为 0
fn angle_between(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    u.cross(v).norm().atan2(u.dot(v)).to_degrees()
}

/// 两个极图方向的夹角（度）
pub fn angular_distance(alpha1: f64, beta1: f64, alpha2: f64, beta2: f64) -> f64 {
    angle_between(&direction(alpha1, beta1), &direction(alpha2, beta2))
}

/// 由峰参数表构建极图
pub fn pole_figure(infos: &[PeakInfo], params: &InterpolParams) -> Vec<PolePoint> {
    let measured: Vec<PolePoint> = infos.iter().map(PolePoint::from_info).collect();
    if !params.enabled {
        return measured;
    }

    let usable: Vec<PolePoint> = measured
        .into_iter()
        .filter(|p| p.intensity.is_finite() && p.alpha.is_finite() && p.beta.is_finite())
        .collect();
    if usable.is_empty() {
        log::warn!("no usable peak data for pole figure interpolation");
    }

    let n_alpha = (90.0 / params.step_alpha + 1e-9).floor() as usize + 1;
    let n_beta = ((360.0 / params.step_beta - 1e-9).ceil() as usize).max(1);
    let mut grid = Vec::with_capacity(n_alpha * n_beta);
    for i in 0..n_alpha {
        let alpha = i as f64 * params.step_alpha;
        for j in 0..n_beta {
            let beta = j as f64 * params.step_beta;
            grid.push(interpolate_at(&usable, alpha, beta, params));
        }
    }
    grid
}

fn interpolate_at(
    points: &[PolePoint],
    alpha: f64,
    beta: f64,
    params: &InterpolParams,
) -> PolePoint {
    let target = direction(alpha, beta);
    let distances: Vec<f64> = points
        .iter()
        .map(|p| angle_between(&p.direction(), &target))
        .collect();

    if alpha <= params.avg_alpha_max {
        let near: Vec<&PolePoint> = points
            .iter()
            .zip(&distances)
            .filter(|(_, d)| **d <= params.avg_radius)
            .map(|(p, _)| p)
            .collect();
        if let Some(p) = trimmed_mean(near, params.threshold, alpha, beta) {
            return p;
        }
    }
    inverse_distance(points, &distances, params.idw_radius, alpha, beta)
}

/// 按强度排序，保留以中位数为中心的 `threshold`% 个点取平均
fn trimmed_mean(
    mut near: Vec<&PolePoint>,
    threshold: u32,
    alpha: f64,
    beta: f64,
) -> Option<PolePoint> {
    if near.is_empty() {
        return None;
    }
    near.sort_by(|a, b| a.intensity.total_cmp(&b.intensity));
    let n = near.len();
    let keep = ((n as f64 * threshold as f64 / 100.0).ceil() as usize).clamp(1, n);
    let start = (n - keep) / 2;
    let kept = &near[start..start + keep];

    let mean = |f: fn(&PolePoint) -> f64| kept.iter().map(|p| f(p)).sum::<f64>() / keep as f64;
    Some(PolePoint {
        alpha,
        beta,
        center: mean(|p| p.center),
        fwhm: mean(|p| p.fwhm),
        intensity: mean(|p| p.intensity),
    })
}

fn inverse_distance(
    points: &[PolePoint],
    distances: &[f64],
    radius: f64,
    alpha: f64,
    beta: f64,
) -> PolePoint {
    let mut weight_sum = 0.0;
    let mut sums = [0.0; 3];
    for (p, &d) in points.iter().zip(distances) {
        if d > radius {
            continue;
        }
        // 与测量点重合
        if d < 1e-9 {
            return PolePoint { alpha, beta, ..*p };
        }
        let w = 1.0 / (d * d);
        weight_sum += w;
        sums[0] += w * p.center;
        sums[1] += w * p.fwhm;
        sums[2] += w * p.intensity;
    }
    if weight_sum == 0.0 {
        return PolePoint::missing(alpha, beta);
    }
    PolePoint {
        alpha,
        beta,
        center: sums[0] / weight_sum,
        fwhm: sums[1] / weight_sum,
        intensity: sums[2] / weight_sum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::FitStatus;
    use crate::fit::DoubleWithError;
    use crate::pars::PeakShape;

    fn info(alpha: f64, beta: f64, intensity: f64) -> PeakInfo {
        PeakInfo {
            cluster: 0,
            omg: 0.0,
            phi: 0.0,
            chi: 0.0,
            tth: 40.0,
            gamma: 0.0,
            alpha,
            beta,
            shape: PeakShape::Gaussian,
            status: FitStatus::Fitted,
            center: DoubleWithError::exact(40.0),
            fwhm: DoubleWithError::exact(0.5),
            intensity: DoubleWithError::exact(intensity),
        }
    }

    fn enabled() -> InterpolParams {
        InterpolParams {
            enabled: true,
            ..InterpolParams::default()
        }
    }

    #[test]
    fn test_disabled_keeps_measured_points() {
        let infos = vec![info(10.0, 20.0, 5.0), info(60.0, 200.0, 7.0)];
        let pf = pole_figure(&infos, &InterpolParams::default());
        assert_eq!(pf.len(), 2);
        assert_eq!(pf[1].alpha, 60.0);
        assert_eq!(pf[1].intensity, 7.0);
    }

    #[test]
    fn test_grid_size() {
        let pf = pole_figure(&[info(45.0, 90.0, 1.0)], &enabled());
        // α: 0, 5, ..., 90；β: 0, 5, ..., 355
        assert_eq!(pf.len(), 19 * 72);
        assert!(pf.iter().all(|p| (0.0..=90.0).contains(&p.alpha)));
        assert!(pf.iter().all(|p| (0.0..360.0).contains(&p.beta)));
    }

    #[test]
    fn test_angular_distance() {
        assert!(angular_distance(0.0, 0.0, 0.0, 123.0).abs() < 1e-6);
        assert!((angular_distance(90.0, 0.0, 90.0, 90.0) - 90.0).abs() < 1e-9);
        assert!((angular_distance(30.0, 10.0, 40.0, 10.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_idw_hits_measured_point_exactly() {
        let infos = vec![info(45.0, 90.0, 8.0), info(50.0, 95.0, 2.0)];
        let pf = pole_figure(&infos, &enabled());
        let at = pf
            .iter()
            .find(|p| p.alpha == 45.0 && p.beta == 90.0)
            .unwrap();
        assert!((at.intensity - 8.0).abs() < 1e-12);

        // 两点之间的网格点取加权值
        let between = pf
            .iter()
            .find(|p| p.alpha == 50.0 && p.beta == 90.0)
            .unwrap();
        assert!(between.intensity > 2.0 && between.intensity < 8.0);
    }

    #[test]
    fn test_far_from_data_is_missing() {
        let pf = pole_figure(&[info(80.0, 0.0, 1.0)], &enabled());
        let far = pf
            .iter()
            .find(|p| p.alpha == 80.0 && p.beta == 180.0)
            .unwrap();
        assert!(far.is_missing());
    }

    #[test]
    fn test_average_near_pole_with_threshold() {
        let infos = vec![
            info(1.0, 0.0, 1.0),
            info(2.0, 120.0, 2.0),
            info(3.0, 240.0, 100.0),
        ];
        let all = pole_figure(&infos, &enabled());
        assert!((all[0].intensity - 103.0 / 3.0).abs() < 1e-9);

        // 只保留中位数
        let trimmed = pole_figure(
            &infos,
            &InterpolParams {
                threshold: 33,
                ..enabled()
            },
        );
        assert!((trimmed[0].intensity - 2.0).abs() < 1e-12);
        assert!((trimmed[0].center - 40.0).abs() < 1e-12);
    }
}
