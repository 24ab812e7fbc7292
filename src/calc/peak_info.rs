//! # 峰参数表
//!
//! 每个 Cluster 一行：平均测角仪角度、γ 扇区中点、极图角 α/β，
//! 以及峰位、半高宽、积分强度（拟合成功时带误差，否则取原始统计且误差为 NaN）。
//!
//! α/β 由散射矢量依次经 2θ/2、γ、ω、χ、φ 旋转得到；α 折回上半球，
//! β 取 [0, 360)。
//!
//! ## 依赖关系
//! - 被 `session.rs`, `export/peaks.rs`, `commands/peaks.rs` 使用
//! - 使用 `nalgebra` 做三维旋转

use crate::calc::dfgram::{Dfgram, PeakOutcome};
use crate::data::Cluster;
use crate::fit::DoubleWithError;
use crate::pars::PeakShape;

use nalgebra::{Rotation3, Vector3};
use serde::Serialize;
use std::f64::consts::PI;

/// 峰的拟合状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    /// 只做原始统计
    Raw,
    /// 拟合失败，数值取原始统计
    Failed,
    Fitted,
}

impl std::fmt::Display for FitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitStatus::Raw => write!(f, "raw"),
            FitStatus::Failed => write!(f, "failed"),
            FitStatus::Fitted => write!(f, "fitted"),
        }
    }
}

/// 一个 Cluster 上一个峰的参数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakInfo {
    pub cluster: usize,
    pub omg: f64,
    pub phi: f64,
    pub chi: f64,
    pub tth: f64,
    /// γ 扇区中点
    pub gamma: f64,
    pub alpha: f64,
    pub beta: f64,
    pub shape: PeakShape,
    pub status: FitStatus,
    pub center: DoubleWithError,
    pub fwhm: DoubleWithError,
    pub intensity: DoubleWithError,
}

impl PeakInfo {
    pub fn new(cluster: &Cluster, dfgram: &Dfgram, peak: &PeakOutcome) -> Self {
        let md = cluster.metadata();
        let gamma = dfgram.gamma_range().center();

        let fitted = peak.fitted.as_ref().filter(|f| f.success());
        let status = match (&peak.fitted, fitted) {
            (None, _) => FitStatus::Raw,
            (Some(_), None) => FitStatus::Failed,
            (Some(_), Some(_)) => FitStatus::Fitted,
        };

        let (center, fwhm, intensity) = match fitted {
            Some(f) => (
                f.center().unwrap_or_default(),
                f.fwhm().unwrap_or_default(),
                f.intensity().unwrap_or_default(),
            ),
            None => (
                DoubleWithError::exact(peak.raw.center),
                DoubleWithError::exact(peak.raw.fwhm),
                DoubleWithError::exact(peak.raw.intensity),
            ),
        };

        // 极图角用峰位而不是探测器臂角
        let tth = if center.value.is_finite() {
            center.value
        } else {
            md.tth()
        };
        let (alpha, beta) = alpha_beta(md.omg(), md.phi(), md.chi(), tth, gamma);

        Self {
            cluster: cluster.index(),
            omg: md.omg(),
            phi: md.phi(),
            chi: md.chi(),
            tth: md.tth(),
            gamma,
            alpha,
            beta,
            shape: peak.shape,
            status,
            center,
            fwhm,
            intensity,
        }
    }
}

/// 绕 z 轴顺时针
fn rot_cw_z(deg: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), -deg.to_radians())
}

/// 绕 x 轴顺时针
fn rot_cw_x(deg: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), -deg.to_radians())
}

/// 极图角 (α, β)，度
pub fn alpha_beta(omg: f64, phi: f64, chi: f64, tth: f64, gamma: f64) -> (f64, f64) {
    let ccw_theta = Rotation3::from_axis_angle(&Vector3::z_axis(), (tth / 2.0).to_radians());
    let r = rot_cw_z(phi) * rot_cw_x(chi) * rot_cw_z(omg) * rot_cw_x(gamma) * ccw_theta;
    let v = r * Vector3::new(0.0, 1.0, 0.0);

    let mut alpha = v.z.clamp(-1.0, 1.0).acos();
    let mut beta = v.x.atan2(v.y);
    // 折回上半球
    if alpha > PI / 2.0 {
        alpha = PI - alpha;
        beta += PI;
    }
    let beta = beta.rem_euclid(2.0 * PI);
    (alpha.to_degrees(), beta.to_degrees())
}
