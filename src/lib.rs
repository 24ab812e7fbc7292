//! # dfred - 二维衍射探测器图像归约库
//!
//! 将带测角仪元数据的二维探测器图像序列归约为一维衍射图
//! （强度 vs 2θ），并拟合多项式基线与峰形参数。
//!
//! ## 流程
//! 测量 → 分组（Cluster）→ 角度映射 + 平场校正 → 按 2θ 分箱 → 基线/峰拟合
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── session.rs  (聚合根：数据集、设置、缓存)
//!   │     ├── calc/     (角度映射、衍射图、峰参数表)
//!   │     ├── data/     (数据文件、Cluster、Sequence、校正集)
//!   │     ├── cache/    (惰性缓存)
//!   │     └── pars/     (可序列化设置)
//!   ├── fit/        (LM 拟合引擎与拟合函数)
//!   ├── models/     (元数据、图像、曲线、区间)
//!   ├── loaders/    (.dat 摘要与 TIFF 读取)
//!   ├── export/     (CSV / XY 导出)
//!   └── error.rs    (错误处理)
//! ```

pub mod cache;
pub mod calc;
pub mod data;
pub mod error;
pub mod export;
pub mod fit;
pub mod loaders;
pub mod models;
pub mod pars;
pub mod session;

pub use error::{DfredError, Result};
pub use session::{CacheStats, Session};
