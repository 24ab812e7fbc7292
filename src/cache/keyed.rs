//! # 单键缓存
//!
//! 保存至多一个缓存值，并记录产生该值的键。
//!
//! ## 依赖关系
//! - 被 `session.rs` 用于缓存角度映射（键为探测器臂角 2θ）

use std::convert::Infallible;

/// 单键缓存
#[derive(Debug, Clone)]
pub struct KeyedCache<T, K> {
    /// 缓存值及其键
    cached: Option<(K, T)>,
}

impl<T, K> Default for KeyedCache<T, K> {
    fn default() -> Self {
        Self { cached: None }
    }
}

impl<T, K: PartialEq> KeyedCache<T, K> {
    /// 创建空缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 取值；键不同或缓存为空时调用 `compute` 重新计算
    ///
    /// `compute` 失败时错误原样返回，之前缓存的值（若有）保留。
    pub fn get<E, F>(&mut self, key: K, compute: F) -> Result<&T, E>
    where
        F: FnOnce(&K) -> Result<T, E>,
    {
        let entry = match self.cached.take() {
            Some((k, v)) if k == key => (k, v),
            previous => match compute(&key) {
                Ok(value) => (key, value),
                Err(e) => {
                    self.cached = previous;
                    return Err(e);
                }
            },
        };
        Ok(&self.cached.insert(entry).1)
    }

    /// 不会失败的计算版本
    pub fn get_or_compute<F>(&mut self, key: K, compute: F) -> &T
    where
        F: FnOnce(&K) -> T,
    {
        match self.get(key, |k| Ok::<T, Infallible>(compute(k))) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// 是否缓存了该键对应的值
    pub fn is_cached(&self, key: &K) -> bool {
        matches!(&self.cached, Some((k, _)) if k == key)
    }

    /// 当前缓存的键
    pub fn cached_key(&self) -> Option<&K> {
        self.cached.as_ref().map(|(k, _)| k)
    }

    /// 无条件清空
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_computes_once() {
        let mut cache: KeyedCache<Vec<f64>, i32> = KeyedCache::new();
        let mut calls = 0;

        let first = cache
            .get_or_compute(3, |k| {
                calls += 1;
                vec![*k as f64]
            })
            .clone();
        let second = cache.get_or_compute(3, |_| {
            calls += 1;
            vec![-1.0]
        });

        assert_eq!(calls, 1);
        assert_eq!(&first, second);
    }

    #[test]
    fn test_new_key_recomputes() {
        let mut cache: KeyedCache<f64, i32> = KeyedCache::new();
        assert_eq!(*cache.get_or_compute(1, |k| *k as f64 * 10.0), 10.0);
        assert_eq!(*cache.get_or_compute(2, |k| *k as f64 * 10.0), 20.0);
        assert!(cache.is_cached(&2));
        assert!(!cache.is_cached(&1));
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let mut cache: KeyedCache<u32, &str> = KeyedCache::new();
        let mut calls = 0;
        cache.get_or_compute("a", |_| {
            calls += 1;
            1
        });
        cache.invalidate();
        assert!(cache.cached_key().is_none());
        cache.get_or_compute("a", |_| {
            calls += 1;
            2
        });
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_failed_compute_keeps_previous() {
        let mut cache: KeyedCache<u32, u32> = KeyedCache::new();
        assert_eq!(*cache.get(1, |_| Ok::<u32, String>(11)).unwrap(), 11);

        let err = cache.get(2, |_| Err::<u32, String>("boom".to_string()));
        assert_eq!(err.unwrap_err(), "boom");

        // 键 1 的值仍在，不需要重算
        assert!(cache.is_cached(&1));
        let v = cache.get(1, |_| Err::<u32, String>("must not run".to_string()));
        assert_eq!(*v.unwrap(), 11);
    }

    #[test]
    fn test_failed_compute_on_empty_leaves_empty() {
        let mut cache: KeyedCache<u32, u32> = KeyedCache::new();
        assert!(cache.get(5, |_| Err::<u32, ()>(())).is_err());
        assert!(cache.cached_key().is_none());
    }
}
