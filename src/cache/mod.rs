//! # 惰性缓存模块
//!
//! 两种通用的记忆化原语，用于推迟并复用代价高昂的重算：
//! - `KeyedCache`: 至多保存一个值，并标记产生它的键（用于角度映射）
//! - `VectorCache`: 每个单元（Cluster）一个可选值（用于衍射图）
//!
//! 缓存本身不追踪依赖。任何被计算函数读取的外部输入（几何、归一化、
//! 校正图像、基线/峰设置）发生变化时，由拥有者 `Session` 负责调用
//! `invalidate` / `invalidate_all`。
//!
//! 计算失败时不会写入任何部分结果：已有的值保持不变，空槽保持为空。
//!
//! ## 依赖关系
//! - 被 `session.rs` 使用
//! - 无外部模块依赖

pub mod keyed;
pub mod vector;

pub use keyed::KeyedCache;
pub use vector::VectorCache;
