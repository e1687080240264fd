//! 查询上下文缓存模块
//!
//! 按查询ID缓存执行上下文的弱引用，支持最近使用排序和感知存活状态的驱逐

pub mod query_context_cache;
pub mod stats_collector;

pub use query_context_cache::{QueryContextCache, DEFAULT_INITIAL_CAPACITY};
pub use stats_collector::CacheStats;
