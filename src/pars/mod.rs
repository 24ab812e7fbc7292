//! # 设置参数模块
//!
//! 探测器几何、归约参数、基线与峰设置、极图插值参数，以及可持久化的聚合设置。
//!
//! ## 依赖关系
//! - 被 `calc/`, `session.rs`, `commands/` 使用
//! - 子模块: detector, params, baseline, peaks, interpol, settings

pub mod baseline;
pub mod detector;
pub mod interpol;
pub mod params;
pub mod peaks;
pub mod settings;

pub use baseline::BaselineSettings;
pub use detector::{Geometry, ImageCut, ImageTransform};
pub use interpol::InterpolParams;
pub use params::{BinningParams, GammaSector, GammaSelection, IntensityParams, NormMode, Params};
pub use peaks::{PeakGuess, PeakSettings, PeakShape};
pub use settings::SessionSettings;
