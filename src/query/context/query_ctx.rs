//! 查询执行上下文
//!
//! 一个查询在本节点上所有任务共享的运行时状态：查询配置、连接器配置和执行线程池。
//! 由执行该查询的任务通过 `Arc` 共同持有，最后一个任务释放时销毁。

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::executor::Executor;
use super::query_config::QueryConfig;
use crate::core::error::ContextResult;
use crate::core::ids::QueryId;

/// 按连接器（catalog）名称分组的配置
pub type ConnectorConfigs = HashMap<String, HashMap<String, String>>;

pub struct QueryCtx {
    query_id: QueryId,
    config: QueryConfig,
    connector_configs: ConnectorConfigs,
    driver_executor: Arc<Executor>,
    spiller_executor: Arc<Executor>,
    created_at: DateTime<Utc>,
}

impl QueryCtx {
    /// 创建查询上下文
    ///
    /// 配置校验失败时返回错误，不产生任何上下文。
    pub fn create(
        query_id: QueryId,
        config_strings: HashMap<String, String>,
        connector_configs: ConnectorConfigs,
        driver_executor: Arc<Executor>,
        spiller_executor: Arc<Executor>,
    ) -> ContextResult<Arc<Self>> {
        let config = QueryConfig::new(config_strings)?;
        Ok(Arc::new(Self {
            query_id,
            config,
            connector_configs,
            driver_executor,
            spiller_executor,
            created_at: Utc::now(),
        }))
    }

    pub fn query_id(&self) -> &QueryId {
        &self.query_id
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn connector_configs(&self) -> &ConnectorConfigs {
        &self.connector_configs
    }

    pub fn connector_config(&self, catalog: &str) -> Option<&HashMap<String, String>> {
        self.connector_configs.get(catalog)
    }

    pub fn driver_executor(&self) -> &Arc<Executor> {
        &self.driver_executor
    }

    pub fn spiller_executor(&self) -> &Arc<Executor> {
        &self.spiller_executor
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Debug for QueryCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCtx")
            .field("query_id", &self.query_id)
            .field("config_entries", &self.config.len())
            .field("connectors", &self.connector_configs.len())
            .field("driver_executor", &self.driver_executor.name())
            .field("spiller_executor", &self.spiller_executor.name())
            .field("created_at", &self.created_at)
            .finish()
    }
}
