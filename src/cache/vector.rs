//! # 按单元的向量缓存
//!
//! 每个单元（以索引标识，例如 Cluster 的全局序号）一个可选缓存值。
//!
//! ## 依赖关系
//! - 被 `session.rs` 用于缓存每个 Cluster 的衍射图

/// 按单元的向量缓存
#[derive(Debug, Clone)]
pub struct VectorCache<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for VectorCache<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> VectorCache<T> {
    /// 创建空缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 取单元 `unit` 的值；未缓存时调用 `compute` 计算并保存
    ///
    /// `compute` 失败时槽位保持为空，错误原样返回。
    pub fn value_for<E, F>(&mut self, unit: usize, compute: F) -> Result<&T, E>
    where
        F: FnOnce(usize) -> Result<T, E>,
    {
        self.ensure_len(unit + 1);
        let value = match self.slots[unit].take() {
            Some(v) => v,
            None => compute(unit)?,
        };
        Ok(self.slots[unit].insert(value))
    }

    /// 只读访问（不触发计算）
    pub fn get(&self, unit: usize) -> Option<&T> {
        self.slots.get(unit).and_then(|s| s.as_ref())
    }

    /// 直接写入已计算好的值（用于并行批量计算后的回填）
    pub fn set(&mut self, unit: usize, value: T) {
        self.ensure_len(unit + 1);
        self.slots[unit] = Some(value);
    }

    /// 该单元是否已缓存
    pub fn is_cached(&self, unit: usize) -> bool {
        self.get(unit).is_some()
    }

    /// 清空所有单元
    pub fn invalidate_all(&mut self) {
        self.slots.clear();
    }

    /// 已缓存的单元数量
    pub fn cached_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn ensure_len(&mut self, len: usize) {
        if self.slots.len() < len {
            self.slots.resize_with(len, || None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(v: i64) -> Result<i64, String> {
        Ok(v)
    }

    #[test]
    fn test_value_for_computes_once_per_unit() {
        let mut cache = VectorCache::new();
        let mut calls = 0;

        for _ in 0..3 {
            let v = cache
                .value_for(4, |u| {
                    calls += 1;
                    ok(u as i64 * 2)
                })
                .unwrap();
            assert_eq!(*v, 8);
        }
        assert_eq!(calls, 1);
        assert!(cache.is_cached(4));
        assert!(!cache.is_cached(0));
        assert_eq!(cache.cached_count(), 1);
    }

    #[test]
    fn test_invalidate_all_recomputes_every_unit() {
        let mut cache = VectorCache::new();
        cache.value_for(0, |_| ok(1)).unwrap();
        cache.value_for(1, |_| ok(2)).unwrap();
        cache.invalidate_all();

        let mut calls = 0;
        for unit in 0..2 {
            cache
                .value_for(unit, |_| {
                    calls += 1;
                    ok(0)
                })
                .unwrap();
        }
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_failed_compute_leaves_slot_empty() {
        let mut cache: VectorCache<i64> = VectorCache::new();
        let res = cache.value_for(2, |_| Err::<i64, String>("bad".to_string()));
        assert!(res.is_err());
        assert!(!cache.is_cached(2));
        assert_eq!(*cache.value_for(2, |_| ok(7)).unwrap(), 7);
    }

    #[test]
    fn test_set_then_get() {
        let mut cache = VectorCache::new();
        cache.set(3, "dfgram");
        assert_eq!(cache.get(3), Some(&"dfgram"));
        assert_eq!(cache.get(10), None);
    }
}
