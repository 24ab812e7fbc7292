//! # 测量元数据
//!
//! 每次测量的标量属性：测角仪角度、监视器计数、曝光时间，以及自由的
//! 数值/字符串字段。构造后不可变。
//!
//! ## 平均策略
//! - 角度（`omg`, `phi`, `chi`, `tth`）：算术平均，不处理 360° 回绕。
//!   仪器在一个 Cluster 内只有围绕设定点的小幅运动，这里假设不跨越回绕边界。
//! - 累加量（`mon`, `t`）：求和
//! - `delta_mon`, `delta_t`：成员间 `mon` / `t` 的最大值减最小值
//! - 其他数值字段：算术平均
//! - 字符串字段：取第一个成员的值
//!
//! ## 依赖关系
//! - 被 `models/measurement.rs`, `data/sequence.rs` 使用
//! - 使用 `serde` 派生序列化

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 元数据键
pub mod keys {
    pub const OMG: &str = "omg";
    pub const PHI: &str = "phi";
    pub const CHI: &str = "chi";
    pub const TTH: &str = "tth";
    pub const MONITOR: &str = "mon";
    pub const DELTA_MONITOR: &str = "delta_mon";
    pub const TIME: &str = "t";
    pub const DELTA_TIME: &str = "delta_t";
    pub const COMMENT: &str = "comment";
    pub const DATE: &str = "date";

    /// 固定的数值键，用于平均与统计
    pub const NUMERIC: [&str; 8] = [OMG, PHI, CHI, TTH, MONITOR, DELTA_MONITOR, TIME, DELTA_TIME];
}

/// 元数据值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Real(f64),
    Text(String),
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Real(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl std::fmt::Display for MetaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaValue::Real(v) => write!(f, "{}", v),
            MetaValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// 测量元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    values: BTreeMap<String, MetaValue>,
}

impl Metadata {
    /// 创建空元数据
    pub fn new() -> Self {
        Self::default()
    }

    /// 构造时设置字段（链式调用）
    pub fn with(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// 获取字段
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.values.get(key)
    }

    /// 获取数值字段
    pub fn real(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some(MetaValue::Real(v)) => Some(*v),
            _ => None,
        }
    }

    /// 获取字符串字段
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(MetaValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 所有字段名
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// 数值字段名
    pub fn numeric_keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter_map(|(k, v)| match v {
            MetaValue::Real(_) => Some(k.as_str()),
            MetaValue::Text(_) => None,
        })
    }

    pub fn omg(&self) -> f64 {
        self.real(keys::OMG).unwrap_or(0.0)
    }

    pub fn phi(&self) -> f64 {
        self.real(keys::PHI).unwrap_or(0.0)
    }

    pub fn chi(&self) -> f64 {
        self.real(keys::CHI).unwrap_or(0.0)
    }

    /// 探测器臂角 2θ（度）
    pub fn tth(&self) -> f64 {
        self.real(keys::TTH).unwrap_or(0.0)
    }

    pub fn monitor_count(&self) -> f64 {
        self.real(keys::MONITOR).unwrap_or(0.0)
    }

    pub fn delta_monitor_count(&self) -> f64 {
        self.real(keys::DELTA_MONITOR).unwrap_or(0.0)
    }

    pub fn time(&self) -> f64 {
        self.real(keys::TIME).unwrap_or(0.0)
    }

    pub fn delta_time(&self) -> f64 {
        self.real(keys::DELTA_TIME).unwrap_or(0.0)
    }

    /// 合成多个成员的平均元数据
    pub fn average<'a, I>(members: I) -> Metadata
    where
        I: IntoIterator<Item = &'a Metadata>,
    {
        let members: Vec<&Metadata> = members.into_iter().collect();
        let mut out = Metadata::new();
        let Some(first) = members.first() else {
            return out;
        };

        // 字符串取第一个成员
        for (k, v) in &first.values {
            if let MetaValue::Text(_) = v {
                out.values.insert(k.clone(), v.clone());
            }
        }

        // 所有成员出现过的数值键
        let mut numeric: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for md in &members {
            for (k, v) in &md.values {
                if let MetaValue::Real(x) = v {
                    numeric.entry(k.as_str()).or_default().push(*x);
                }
            }
        }

        for (key, vals) in &numeric {
            let value = match *key {
                keys::MONITOR | keys::TIME => vals.iter().sum(),
                keys::DELTA_MONITOR | keys::DELTA_TIME => continue,
                _ => vals.iter().sum::<f64>() / vals.len() as f64,
            };
            out.values.insert(key.to_string(), MetaValue::Real(value));
        }

        // 不稳定性标记：成员间的最大值减最小值
        for (src, dst) in [
            (keys::MONITOR, keys::DELTA_MONITOR),
            (keys::TIME, keys::DELTA_TIME),
        ] {
            if let Some(vals) = numeric.get(src) {
                let max = vals.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let min = vals.iter().cloned().fold(f64::INFINITY, f64::min);
                out.values.insert(dst.to_string(), MetaValue::Real(max - min));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(omg: f64, mon: f64, t: f64) -> Metadata {
        Metadata::new()
            .with(keys::OMG, omg)
            .with(keys::MONITOR, mon)
            .with(keys::TIME, t)
            .with("temperature", 300.0 + omg)
            .with(keys::COMMENT, format!("omg {}", omg))
    }

    #[test]
    fn test_accessors_default_to_zero() {
        let m = Metadata::new().with(keys::PHI, 12.5);
        assert_eq!(m.phi(), 12.5);
        assert_eq!(m.omg(), 0.0);
        assert_eq!(m.text(keys::PHI), None);
    }

    #[test]
    fn test_average_sums_and_means() {
        let a = md(10.0, 100.0, 1.0);
        let b = md(12.0, 200.0, 3.0);
        let avg = Metadata::average([&a, &b]);

        assert!((avg.omg() - 11.0).abs() < 1e-12);
        assert!((avg.monitor_count() - 300.0).abs() < 1e-12);
        assert!((avg.time() - 4.0).abs() < 1e-12);
        assert!((avg.delta_monitor_count() - 100.0).abs() < 1e-12);
        assert!((avg.delta_time() - 2.0).abs() < 1e-12);
        assert!((avg.real("temperature").unwrap() - 311.0).abs() < 1e-12);
        assert_eq!(avg.text(keys::COMMENT), Some("omg 10"));
    }

    #[test]
    fn test_average_single_member_has_zero_deltas() {
        let a = md(5.0, 42.0, 2.0);
        let avg = Metadata::average([&a]);
        assert_eq!(avg.monitor_count(), 42.0);
        assert_eq!(avg.delta_monitor_count(), 0.0);
    }

    #[test]
    fn test_average_empty() {
        let avg = Metadata::average(std::iter::empty());
        assert_eq!(avg.keys().count(), 0);
    }
}
