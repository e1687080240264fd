//! 会话属性
//!
//! 协调节点以会话属性名下发配置，本节点使用内部配置键。
//! 这里维护两者的对应关系和取值类型；未登记的属性名原样透传。

use std::collections::HashMap;

use crate::core::error::{ContextError, ContextResult};
use crate::query::context::query_config::{self, ValueKind};

/// 单个会话属性的定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProperty {
    pub name: &'static str,
    pub config_key: &'static str,
    pub kind: ValueKind,
}

const BUILTIN_PROPERTIES: &[SessionProperty] = &[
    SessionProperty {
        name: "native_spill_enabled",
        config_key: query_config::SPILL_ENABLED,
        kind: ValueKind::Boolean,
    },
    SessionProperty {
        name: "native_join_spill_enabled",
        config_key: query_config::JOIN_SPILL_ENABLED,
        kind: ValueKind::Boolean,
    },
    SessionProperty {
        name: "native_aggregation_spill_enabled",
        config_key: query_config::AGGREGATION_SPILL_ENABLED,
        kind: ValueKind::Boolean,
    },
    SessionProperty {
        name: "native_order_by_spill_enabled",
        config_key: query_config::ORDER_BY_SPILL_ENABLED,
        kind: ValueKind::Boolean,
    },
    SessionProperty {
        name: "native_max_spill_level",
        config_key: query_config::MAX_SPILL_LEVEL,
        kind: ValueKind::UnsignedInteger,
    },
    SessionProperty {
        name: "native_spill_write_buffer_size",
        config_key: query_config::SPILL_WRITE_BUFFER_SIZE,
        kind: ValueKind::DataSize,
    },
    SessionProperty {
        name: "native_max_output_batch_rows",
        config_key: query_config::MAX_OUTPUT_BATCH_ROWS,
        kind: ValueKind::UnsignedInteger,
    },
    SessionProperty {
        name: "query_max_memory_per_node",
        config_key: query_config::QUERY_MAX_MEMORY_PER_NODE,
        kind: ValueKind::DataSize,
    },
    SessionProperty {
        name: "legacy_timestamp",
        config_key: query_config::ADJUST_TIMESTAMP_TO_TIMEZONE,
        kind: ValueKind::Boolean,
    },
];

/// 会话属性表
#[derive(Debug, Clone)]
pub struct SessionProperties {
    properties: HashMap<&'static str, SessionProperty>,
}

impl SessionProperties {
    pub fn new() -> Self {
        Self {
            properties: BUILTIN_PROPERTIES
                .iter()
                .map(|p| (p.name, p.clone()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SessionProperty> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// 转换为 `(配置键, 归一化后的取值)`，未登记的属性名和取值原样返回
    pub fn to_config_entry(&self, name: &str, value: &str) -> ContextResult<(String, String)> {
        match self.properties.get(name) {
            Some(property) => {
                let normalized = property
                    .kind
                    .normalize(value)
                    .map_err(|reason| ContextError::invalid_session_property(name, value, reason))?;
                Ok((property.config_key.to_string(), normalized))
            }
            None => Ok((name.to_string(), value.to_string())),
        }
    }
}

impl Default for SessionProperties {
    fn default() -> Self {
        Self::new()
    }
}
