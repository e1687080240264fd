//! 缓存统计信息
//!
//! 统计随缓存一起受管理器的锁保护，这里不再额外加锁

/// 查询上下文缓存统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_hits: u64,
    pub total_misses: u64,
    /// `get` 时发现上下文已销毁而移除的条目数
    pub stale_removals: u64,
    pub total_evictions: u64,
    pub capacity_growths: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit_rate(&self) -> f64 {
        if self.total_hits + self.total_misses == 0 {
            0.0
        } else {
            self.total_hits as f64 / (self.total_hits + self.total_misses) as f64
        }
    }

    pub fn hit_rate_percentage(&self) -> f64 {
        self.hit_rate() * 100.0
    }

    pub fn total_lookups(&self) -> u64 {
        self.total_hits + self.total_misses
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn record_hit(&mut self) {
        self.total_hits += 1;
    }

    /// 过期条目同时计为一次未命中
    pub fn record_miss(&mut self, stale: bool) {
        self.total_misses += 1;
        if stale {
            self.stale_removals += 1;
        }
    }

    pub fn record_eviction(&mut self) {
        self.total_evictions += 1;
    }

    pub fn record_growth(&mut self) {
        self.capacity_growths += 1;
    }
}
