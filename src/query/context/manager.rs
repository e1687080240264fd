//! 查询上下文管理器
//!
//! 任务处理代码获取查询上下文的唯一入口。同一查询的所有任务共享一个上下文：
//! 首个任务到达时创建并登记到缓存，之后的任务直接复用。
//!
//! 查找、创建、登记在同一个锁内完成，保证任一查询ID同时最多只有一个存活的上下文。

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::executor::Executor;
use super::query_config::{SESSION_START_TIME, SESSION_TIMEZONE_KEY};
use super::query_ctx::{ConnectorConfigs, QueryCtx};
use crate::cache::{CacheStats, QueryContextCache};
use crate::config::Config;
use crate::core::error::ContextResult;
use crate::core::ids::{QueryId, TaskId};
use crate::query::session::{SessionProperties, SessionRepresentation, TaskUpdateRequest};

/// 查询上下文管理器
///
/// 进程启动时创建一次，以 `Arc` 传给所有需要它的调用方。
pub struct QueryContextManager {
    driver_executor: Arc<Executor>,
    spiller_executor: Arc<Executor>,
    cache: Mutex<QueryContextCache>,
    session_properties: SessionProperties,
    /// 节点级默认配置，会话未设置时生效
    session_defaults: HashMap<String, String>,
}

impl QueryContextManager {
    pub fn new(driver_executor: Arc<Executor>, spiller_executor: Arc<Executor>) -> Self {
        Self::with_cache(driver_executor, spiller_executor, QueryContextCache::default())
    }

    pub fn with_cache(
        driver_executor: Arc<Executor>,
        spiller_executor: Arc<Executor>,
        cache: QueryContextCache,
    ) -> Self {
        Self {
            driver_executor,
            spiller_executor,
            cache: Mutex::new(cache),
            session_properties: SessionProperties::new(),
            session_defaults: HashMap::new(),
        }
    }

    /// 按配置文件创建管理器及其线程池
    pub fn from_config(config: &Config) -> ContextResult<Self> {
        config.validate()?;
        let driver = Arc::new(Executor::new("driver", config.executor.driver_threads)?);
        let spiller = Arc::new(Executor::new("spiller", config.executor.spiller_threads)?);
        info!(
            "查询上下文管理器初始化: 缓存容量 {}, 驱动线程 {}, 溢写线程 {}",
            config.cache.initial_capacity,
            driver.num_threads(),
            spiller.num_threads()
        );

        let mut manager = Self::with_cache(
            driver,
            spiller,
            QueryContextCache::new(config.cache.initial_capacity),
        );
        manager.session_defaults = config.session_defaults.clone();
        Ok(manager)
    }

    pub fn with_session_defaults(mut self, defaults: HashMap<String, String>) -> Self {
        self.session_defaults = defaults;
        self
    }

    /// 获取或创建任务所属查询的上下文
    ///
    /// 上下文构造失败时返回错误，缓存保持不变。
    pub fn find_or_create_query_ctx(
        &self,
        task_id: &TaskId,
        request: &TaskUpdateRequest,
    ) -> ContextResult<Arc<QueryCtx>> {
        let query_id = task_id.query_id();

        let mut cache = self.cache.lock();
        if let Some(ctx) = cache.get(query_id) {
            debug!("任务 {} 复用查询 {} 的上下文", task_id, query_id);
            return Ok(ctx);
        }

        let config_strings = self.to_query_configs(&request.session)?;
        let connector_configs = Self::to_connector_configs(request);

        let ctx = QueryCtx::create(
            query_id.clone(),
            config_strings,
            connector_configs,
            Arc::clone(&self.driver_executor),
            Arc::clone(&self.spiller_executor),
        )
        .inspect_err(|e| warn!("任务 {} 创建查询 {} 的上下文失败: {}", task_id, query_id, e))?;

        info!(
            "为任务 {} 创建查询 {} 的上下文，缓存条目数 {}",
            task_id,
            query_id,
            cache.size() + 1
        );
        Ok(cache.insert(query_id.clone(), ctx))
    }

    /// 会话属性转为查询配置
    fn to_query_configs(&self, session: &SessionRepresentation) -> ContextResult<HashMap<String, String>> {
        let mut configs = HashMap::with_capacity(session.system_properties.len() + 2);
        for (name, value) in &session.system_properties {
            let (key, value) = self.session_properties.to_config_entry(name, value)?;
            configs.insert(key, value);
        }

        if session.time_zone_key != 0 {
            configs.insert(SESSION_TIMEZONE_KEY.to_string(), session.time_zone_key.to_string());
        }
        if session.start_time != 0 {
            configs.insert(SESSION_START_TIME.to_string(), session.start_time.to_string());
        }

        for (key, value) in &self.session_defaults {
            configs.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Ok(configs)
    }

    /// 连接器属性按 catalog 原样复制，补上会话用户和附加凭据
    ///
    /// catalog 自身的属性优先，不会被用户或凭据覆盖。
    fn to_connector_configs(request: &TaskUpdateRequest) -> ConnectorConfigs {
        let session = &request.session;
        session
            .catalog_properties
            .iter()
            .map(|(catalog, properties)| {
                let mut properties = properties.clone();
                if !session.user.is_empty() {
                    properties
                        .entry("user".to_string())
                        .or_insert_with(|| session.user.clone());
                }
                for (name, value) in &request.extra_credentials {
                    properties.entry(name.clone()).or_insert_with(|| value.clone());
                }
                (catalog.clone(), properties)
            })
            .collect()
    }

    /// 对每个存活的上下文调用 `visitor`
    ///
    /// 在锁内取快照，释放锁后再回调，回调中可以再次调用管理器。
    /// 只读：不调整最近使用顺序，也不移除已销毁的条目。
    pub fn visit_all_contexts<F>(&self, mut visitor: F)
    where
        F: FnMut(&QueryId, &QueryCtx),
    {
        let snapshot = self.cache.lock().live_entries();
        for (query_id, ctx) in &snapshot {
            visitor(query_id, ctx);
        }
    }

    /// 清空缓存，仅供测试使用
    pub fn testing_clear_cache(&self) {
        self.cache.lock().testing_clear();
    }

    pub fn session_properties(&self) -> &SessionProperties {
        &self.session_properties
    }

    pub fn cache_size(&self) -> usize {
        self.cache.lock().size()
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache.lock().capacity()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats().clone()
    }
}

impl fmt::Debug for QueryContextManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContextManager")
            .field("driver_executor", &self.driver_executor)
            .field("spiller_executor", &self.spiller_executor)
            .field("cache", &*self.cache.lock())
            .field("session_defaults", &self.session_defaults.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ContextError;
    use crate::query::context::query_config::{
        MAX_OUTPUT_BATCH_ROWS, MAX_SPILL_LEVEL, QUERY_MAX_MEMORY_PER_NODE,
    };

    fn manager() -> QueryContextManager {
        let driver = Arc::new(Executor::new("driver", 1).expect("创建线程池失败"));
        let spiller = Arc::new(Executor::new("spiller", 1).expect("创建线程池失败"));
        QueryContextManager::new(driver, spiller)
    }

    fn task(text: &str) -> TaskId {
        TaskId::parse(text).expect("解析任务ID失败")
    }

    fn request(query_id: &str) -> TaskUpdateRequest {
        TaskUpdateRequest::new(SessionRepresentation::new(query_id, "alice"))
    }

    #[test]
    fn test_same_query_reuses_context() {
        let manager = manager();
        let first = manager
            .find_or_create_query_ctx(&task("q1.0.0.0.0"), &request("q1"))
            .expect("创建上下文失败");
        let second = manager
            .find_or_create_query_ctx(&task("q1.1.0.3.0"), &request("q1"))
            .expect("获取上下文失败");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.cache_size(), 1);
        let stats = manager.cache_stats();
        assert_eq!(stats.total_misses, 1);
        assert_eq!(stats.total_hits, 1);
    }

    #[test]
    fn test_released_context_is_recreated() {
        let manager = manager();
        let first = manager
            .find_or_create_query_ctx(&task("q1.0.0.0.0"), &request("q1"))
            .expect("创建上下文失败");
        let first_created = first.created_at();
        drop(first);

        let second = manager
            .find_or_create_query_ctx(&task("q1.0.0.1.0"), &request("q1"))
            .expect("创建上下文失败");
        assert!(second.created_at() >= first_created);
        assert_eq!(manager.cache_size(), 1);
        assert_eq!(manager.cache_stats().stale_removals, 1);
        assert_eq!(manager.cache_stats().total_misses, 2);
    }

    #[test]
    fn test_session_configs_applied() {
        let manager = manager().with_session_defaults(HashMap::from([
            (QUERY_MAX_MEMORY_PER_NODE.to_string(), "1GB".to_string()),
            (MAX_SPILL_LEVEL.to_string(), "3".to_string()),
        ]));
        let session = SessionRepresentation::new("q1", "alice")
            .with_system_property("native_spill_enabled", "true")
            .with_system_property("native_max_spill_level", "1")
            .with_system_property("unregistered_flag", "on")
            .with_catalog_property("hive", "orc_use_column_names", "true")
            .with_catalog_property("tpch", "user", "bob")
            .with_catalog_property("tpch", "token", "own")
            .with_time_zone_key(2079)
            .with_start_time(1_704_067_200_000);
        let request = TaskUpdateRequest::new(session).with_extra_credential("token", "secret");

        let ctx = manager
            .find_or_create_query_ctx(&task("q1.0.0.0.0"), &request)
            .expect("创建上下文失败");

        let config = ctx.config();
        assert!(config.spill_enabled());
        // 会话值优先于节点默认值
        assert_eq!(config.max_spill_level(), 1);
        assert_eq!(config.query_max_memory_per_node(), 1 << 30);
        assert_eq!(config.get("unregistered_flag"), Some("on"));
        assert_eq!(config.session_timezone_key(), Some(2079));
        assert_eq!(config.get(SESSION_START_TIME), Some("1704067200000"));

        assert_eq!(
            ctx.connector_config("hive").and_then(|c| c.get("user")),
            Some(&"alice".to_string())
        );
        assert_eq!(
            ctx.connector_config("tpch").and_then(|c| c.get("user")),
            Some(&"bob".to_string())
        );
        // 附加凭据补到每个 catalog，已有同名属性时保留 catalog 自身的值
        assert_eq!(
            ctx.connector_config("hive").and_then(|c| c.get("token")),
            Some(&"secret".to_string())
        );
        assert_eq!(
            ctx.connector_config("tpch").and_then(|c| c.get("token")),
            Some(&"own".to_string())
        );
    }

    #[test]
    fn test_out_of_range_session_values_rejected() {
        let manager = manager();
        let bad = TaskUpdateRequest::new(
            SessionRepresentation::new("q1", "alice")
                .with_system_property("native_max_spill_level", "-1")
                .with_system_property("native_max_output_batch_rows", "5000000000"),
        );
        let result = manager.find_or_create_query_ctx(&task("q1.0.0.0.0"), &bad);
        assert!(matches!(result, Err(ContextError::InvalidSessionProperty { .. })));
        assert_eq!(manager.cache_size(), 0);

        let bad_default = self::manager().with_session_defaults(HashMap::from([(
            MAX_OUTPUT_BATCH_ROWS.to_string(),
            "5000000000".to_string(),
        )]));
        let result = bad_default.find_or_create_query_ctx(&task("q2.0.0.0.0"), &request("q2"));
        assert!(matches!(
            result,
            Err(ContextError::InvalidConfig { ref key, .. }) if key == MAX_OUTPUT_BATCH_ROWS
        ));
        assert_eq!(bad_default.cache_size(), 0);
    }

    #[test]
    fn test_construction_failure_leaves_cache_untouched() {
        let manager = manager();
        let _other = manager
            .find_or_create_query_ctx(&task("q0.0.0.0.0"), &request("q0"))
            .expect("创建上下文失败");

        let bad = TaskUpdateRequest::new(
            SessionRepresentation::new("q1", "alice").with_system_property("native_spill_enabled", "perhaps"),
        );
        let result = manager.find_or_create_query_ctx(&task("q1.0.0.0.0"), &bad);
        assert!(matches!(result, Err(ContextError::InvalidSessionProperty { .. })));
        assert_eq!(manager.cache_size(), 1);

        let bad_default = manager_with_bad_default();
        let result = bad_default.find_or_create_query_ctx(&task("q2.0.0.0.0"), &request("q2"));
        assert!(matches!(result, Err(ContextError::InvalidConfig { .. })));
        assert_eq!(bad_default.cache_size(), 0);
    }

    fn manager_with_bad_default() -> QueryContextManager {
        manager().with_session_defaults(HashMap::from([(
            QUERY_MAX_MEMORY_PER_NODE.to_string(),
            "lots".to_string(),
        )]))
    }

    #[test]
    fn test_visit_all_contexts_skips_dead_without_erasing() {
        let manager = manager();
        let _q1 = manager
            .find_or_create_query_ctx(&task("q1.0.0.0.0"), &request("q1"))
            .expect("创建上下文失败");
        let q2 = manager
            .find_or_create_query_ctx(&task("q2.0.0.0.0"), &request("q2"))
            .expect("创建上下文失败");
        drop(q2);

        let mut visited = Vec::new();
        manager.visit_all_contexts(|query_id, ctx| {
            assert_eq!(query_id, ctx.query_id());
            visited.push(query_id.clone());
        });
        assert_eq!(visited, vec![QueryId::new("q1")]);
        assert_eq!(manager.cache_size(), 2);
    }

    #[test]
    fn test_visitor_may_reenter_manager() {
        let manager = manager();
        let _q1 = manager
            .find_or_create_query_ctx(&task("q1.0.0.0.0"), &request("q1"))
            .expect("创建上下文失败");

        let mut sizes = Vec::new();
        manager.visit_all_contexts(|_, _| sizes.push(manager.cache_size()));
        assert_eq!(sizes, vec![1]);
    }

    #[test]
    fn test_testing_clear_cache() {
        let manager = manager();
        let held = manager
            .find_or_create_query_ctx(&task("q1.0.0.0.0"), &request("q1"))
            .expect("创建上下文失败");
        manager.testing_clear_cache();
        assert_eq!(manager.cache_size(), 0);
        // 清空缓存不影响调用方持有的上下文
        assert_eq!(held.query_id().as_str(), "q1");
    }
}
