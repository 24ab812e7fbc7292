//! # 计算模块
//!
//! 角度映射、衍射图构建（分箱、归一化、基线与峰拟合）、峰参数表与极图。
//!
//! ## 依赖关系
//! - 被 `session.rs`, `export/`, `commands/` 使用
//! - 子模块: angle_map, dfgram, peak_info, polefig

pub mod angle_map;
pub mod dfgram;
pub mod peak_info;
pub mod polefig;

pub use angle_map::{AngleMap, ScatterAngles};
pub use dfgram::{Dfgram, PeakOutcome, ReductionInputs};
pub use peak_info::{alpha_beta, FitStatus, PeakInfo};
pub use polefig::{angular_distance, pole_figure, PolePoint};
