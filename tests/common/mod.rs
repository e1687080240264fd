//! 集成测试共享工具模块
//!
//! 提供线程池、管理器和请求的构造函数，供所有集成测试使用

#![allow(dead_code)]

use std::sync::Arc;

use query_context::cache::QueryContextCache;
use query_context::core::TaskId;
use query_context::query::context::Executor;
use query_context::query::{QueryContextManager, SessionRepresentation, TaskUpdateRequest};

/// 测试用的驱动和溢写线程池
pub fn test_executors() -> (Arc<Executor>, Arc<Executor>) {
    (
        Arc::new(Executor::new("test-driver", 2).expect("创建驱动线程池失败")),
        Arc::new(Executor::new("test-spiller", 1).expect("创建溢写线程池失败")),
    )
}

/// 默认容量的管理器
pub fn test_manager() -> QueryContextManager {
    let (driver, spiller) = test_executors();
    QueryContextManager::new(driver, spiller)
}

/// 指定初始容量的管理器
pub fn test_manager_with_capacity(capacity: usize) -> QueryContextManager {
    let (driver, spiller) = test_executors();
    QueryContextManager::with_cache(driver, spiller, QueryContextCache::new(capacity))
}

/// 查询的第 `n` 个任务
pub fn task_of(query_id: &str, n: u32) -> TaskId {
    TaskId::parse(&format!("{}.0.0.{}.0", query_id, n)).expect("解析任务ID失败")
}

/// 只带用户的最简请求
pub fn simple_request(query_id: &str) -> TaskUpdateRequest {
    TaskUpdateRequest::new(SessionRepresentation::new(query_id, "tester"))
}
