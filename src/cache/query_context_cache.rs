//! 查询上下文缓存
//!
//! 以查询ID为键、按最近使用排序的缓存，只保存上下文的弱引用。
//! 上下文的生命周期由正在执行该查询的任务决定，缓存只观察其是否存活：
//! 既不会让上下文多活，也不会在上下文仍被使用时将其驱逐。
//!
//! 容量是软上限。驱逐时从最久未使用的一端查找已销毁的上下文；
//! 如果所有上下文都仍在使用，则容量翻倍而不是驱逐。
//! 因此在持续负载下内存占用受并发查询数约束，而不是受配置的容量约束。

use log::{debug, info};
use lru::LruCache;
use std::fmt;
use std::sync::{Arc, Weak};

use super::stats_collector::CacheStats;
use crate::core::ids::QueryId;
use crate::query::context::QueryCtx;

/// 默认初始容量
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// 查询上下文缓存
///
/// 本身不加锁，由 [`QueryContextManager`](crate::query::context::QueryContextManager)
/// 的互斥锁保护全部访问。
pub struct QueryContextCache<T = QueryCtx> {
    initial_capacity: usize,
    capacity: usize,
    /// 键到弱引用的映射，同时维护最近使用顺序（最前为最近使用）
    entries: LruCache<QueryId, Weak<T>>,
    stats: CacheStats,
}

impl<T> QueryContextCache<T> {
    /// 创建指定初始容量的缓存
    ///
    /// 初始容量同时是扩容的下限，为0时按1处理。
    pub fn new(initial_capacity: usize) -> Self {
        let initial_capacity = initial_capacity.max(1);
        Self {
            initial_capacity,
            capacity: initial_capacity,
            entries: LruCache::unbounded(),
            stats: CacheStats::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// 查找查询上下文
    ///
    /// 命中时将该查询移到最前；上下文已销毁时移除条目并按未命中处理。
    pub fn get(&mut self, query_id: &QueryId) -> Option<Arc<T>> {
        let upgraded = match self.entries.peek(query_id) {
            Some(weak) => weak.upgrade(),
            None => {
                self.stats.record_miss(false);
                return None;
            }
        };

        match upgraded {
            Some(ctx) => {
                self.entries.promote(query_id);
                self.stats.record_hit();
                Some(ctx)
            }
            None => {
                self.entries.pop(query_id);
                self.stats.record_miss(true);
                debug!("查询 {} 的上下文已销毁，移除缓存条目", query_id);
                None
            }
        }
    }

    /// 插入查询上下文，返回传入的同一个引用
    ///
    /// 缓存只保存弱引用，调用方持有的强引用决定上下文的生命周期。
    /// 同一键的旧条目会被覆盖。
    pub fn insert(&mut self, query_id: QueryId, ctx: Arc<T>) -> Arc<T> {
        if self.entries.len() >= self.capacity {
            self.evict();
        }
        self.entries.push(query_id, Arc::downgrade(&ctx));
        ctx
    }

    /// 驱逐最久未使用且已销毁的上下文
    ///
    /// 找不到已销毁的上下文时不驱逐任何条目，改为扩容。
    pub fn evict(&mut self) {
        let victim = self
            .entries
            .iter()
            .rev()
            .find(|(_, weak)| weak.strong_count() == 0)
            .map(|(query_id, _)| query_id.clone());

        match victim {
            Some(query_id) => {
                self.entries.pop(&query_id);
                self.stats.record_eviction();
                debug!("驱逐查询 {} 的缓存条目", query_id);
            }
            None => {
                let old_capacity = self.capacity;
                self.capacity = self
                    .initial_capacity
                    .max(self.capacity.saturating_mul(2));
                self.stats.record_growth();
                info!(
                    "所有 {} 个查询上下文仍在使用，缓存容量 {} -> {}",
                    self.entries.len(),
                    old_capacity,
                    self.capacity
                );
            }
        }
    }

    /// 当前仍存活的上下文快照，按最近使用顺序
    ///
    /// 只读操作：不调整顺序，也不移除已销毁的条目。
    pub fn live_entries(&self) -> Vec<(QueryId, Arc<T>)> {
        self.entries
            .iter()
            .filter_map(|(query_id, weak)| weak.upgrade().map(|ctx| (query_id.clone(), ctx)))
            .collect()
    }

    /// 最近使用顺序的键列表，最前为最近使用
    pub fn recency_order(&self) -> Vec<QueryId> {
        self.entries.iter().map(|(query_id, _)| query_id.clone()).collect()
    }

    /// 清空缓存与统计，仅供测试使用
    pub fn testing_clear(&mut self) {
        self.entries.clear();
        self.stats.reset();
    }
}

impl<T> Default for QueryContextCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_CAPACITY)
    }
}

impl<T> fmt::Debug for QueryContextCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContextCache")
            .field("size", &self.size())
            .field("capacity", &self.capacity)
            .field("initial_capacity", &self.initial_capacity)
            .field("stats", &self.stats)
            .finish()
    }
}
