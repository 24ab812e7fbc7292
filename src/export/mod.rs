//! # 导出模块
//!
//! 衍射图（CSV / XY）、峰参数表与极图（CSV）。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 子模块: dfgram, peaks, polefig

pub mod dfgram;
pub mod peaks;
pub mod polefig;

pub use dfgram::{write_dfgram, ExportFormat};
pub use peaks::peak_infos_to_csv;
pub use polefig::pole_figure_to_csv;
