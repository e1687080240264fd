use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::cache::DEFAULT_INITIAL_CAPACITY;
use crate::core::error::{ContextError, ContextResult};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub executor: ExecutorConfig,
    pub log: LogConfig,
    /// 工作节点级的查询配置默认值，会话未设置的键使用这里的值
    pub session_defaults: HashMap<String, String>,
}

/// 查询上下文缓存配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// 初始容量，同时也是扩容的下限
    pub initial_capacity: usize,
}

/// 驱动与溢写线程池配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExecutorConfig {
    pub driver_threads: usize,
    pub spiller_threads: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            executor: ExecutorConfig::default(),
            log: LogConfig::default(),
            session_defaults: HashMap::new(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let cpus = num_cpus::get();
        Self {
            driver_threads: cpus * 2,
            spiller_threads: cpus.max(1),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "query-context".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> ContextResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> ContextResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> ContextResult<()> {
        if self.cache.initial_capacity == 0 {
            return Err(ContextError::Config("cache.initial_capacity 必须大于0".to_string()));
        }
        if self.executor.driver_threads == 0 {
            return Err(ContextError::Config("executor.driver_threads 必须大于0".to_string()));
        }
        if self.executor.spiller_threads == 0 {
            return Err(ContextError::Config("executor.spiller_threads 必须大于0".to_string()));
        }
        Ok(())
    }
}
