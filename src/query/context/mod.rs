//! 查询上下文模块
//!
//! - `query_ctx.rs` - 查询执行上下文，同一查询的所有任务共享
//! - `query_config.rs` - 查询配置及已知配置键
//! - `executor.rs` - 驱动和溢写线程池
//! - `manager.rs` - 获取或创建查询上下文的同步入口

pub mod executor;
pub mod manager;
pub mod query_config;
pub mod query_ctx;

pub use executor::Executor;
pub use manager::QueryContextManager;
pub use query_config::{QueryConfig, ValueKind};
pub use query_ctx::{ConnectorConfigs, QueryCtx};
