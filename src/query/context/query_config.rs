//! 查询配置
//!
//! 由会话属性和节点默认值合并得到的扁平键值表。
//! 已知键在构造时做类型校验，未知键原样保留。

use std::collections::HashMap;

use crate::core::error::{ContextError, ContextResult};

pub const QUERY_MAX_MEMORY_PER_NODE: &str = "query_max_memory_per_node";
pub const SPILL_ENABLED: &str = "spill_enabled";
pub const JOIN_SPILL_ENABLED: &str = "join_spill_enabled";
pub const AGGREGATION_SPILL_ENABLED: &str = "aggregation_spill_enabled";
pub const ORDER_BY_SPILL_ENABLED: &str = "order_by_spill_enabled";
pub const MAX_SPILL_LEVEL: &str = "max_spill_level";
pub const SPILL_WRITE_BUFFER_SIZE: &str = "spill_write_buffer_size";
pub const MAX_OUTPUT_BATCH_ROWS: &str = "max_output_batch_rows";
pub const ADJUST_TIMESTAMP_TO_TIMEZONE: &str = "adjust_timestamp_to_session_timezone";
pub const SESSION_TIMEZONE_KEY: &str = "session_timezone_key";
pub const SESSION_START_TIME: &str = "session_start_time";

const DEFAULT_QUERY_MAX_MEMORY_PER_NODE: u64 = 4 * 1024 * 1024 * 1024; // 4GB
const DEFAULT_MAX_SPILL_LEVEL: u32 = 4;
const DEFAULT_MAX_OUTPUT_BATCH_ROWS: u32 = 10_000;

/// 配置值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    /// 64 位有符号整数
    Integer,
    /// 0 到 `u32::MAX`
    UnsignedInteger,
    /// 16 位有符号整数，用于时区键
    SmallInteger,
    /// 数据量，如 `512MB`、`1GB`，归一化为字节数
    DataSize,
}

impl ValueKind {
    /// 校验并归一化取值，失败时返回原因
    pub fn normalize(&self, value: &str) -> Result<String, String> {
        let trimmed = value.trim();
        match self {
            ValueKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok("true".to_string()),
                "false" | "0" => Ok("false".to_string()),
                _ => Err("不是布尔值".to_string()),
            },
            ValueKind::Integer => parse_integer::<i64>(trimmed),
            ValueKind::UnsignedInteger => parse_integer::<u32>(trimmed),
            ValueKind::SmallInteger => parse_integer::<i16>(trimmed),
            ValueKind::DataSize => parse_data_size(trimmed).map(|v| v.to_string()),
        }
    }
}

/// 按目标整数类型解析，越界与非整数同样视为无效
fn parse_integer<T>(value: &str) -> Result<String, String>
where
    T: std::str::FromStr + ToString,
{
    if value.parse::<i128>().is_err() {
        return Err("不是整数".to_string());
    }
    value
        .parse::<T>()
        .map(|v| v.to_string())
        .map_err(|_| format!("超出取值范围 [{}]", std::any::type_name::<T>()))
}

fn parse_data_size(value: &str) -> Result<u64, String> {
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number
        .parse()
        .map_err(|_| "不是有效的数据量".to_string())?;
    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => 1 << 10,
        "MB" => 1 << 20,
        "GB" => 1 << 30,
        "TB" => 1 << 40,
        other => return Err(format!("未知的数据量单位 '{}'", other)),
    };
    Ok((number * multiplier as f64) as u64)
}

/// 已知配置键的取值类型
pub fn kind_of(key: &str) -> Option<ValueKind> {
    let kind = match key {
        QUERY_MAX_MEMORY_PER_NODE | SPILL_WRITE_BUFFER_SIZE => ValueKind::DataSize,
        SPILL_ENABLED
        | JOIN_SPILL_ENABLED
        | AGGREGATION_SPILL_ENABLED
        | ORDER_BY_SPILL_ENABLED
        | ADJUST_TIMESTAMP_TO_TIMEZONE => ValueKind::Boolean,
        MAX_SPILL_LEVEL | MAX_OUTPUT_BATCH_ROWS => ValueKind::UnsignedInteger,
        SESSION_TIMEZONE_KEY => ValueKind::SmallInteger,
        SESSION_START_TIME => ValueKind::Integer,
        _ => return None,
    };
    Some(kind)
}

/// 查询配置
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryConfig {
    values: HashMap<String, String>,
}

impl QueryConfig {
    pub fn new(values: HashMap<String, String>) -> ContextResult<Self> {
        let mut normalized = HashMap::with_capacity(values.len());
        for (key, value) in values {
            let value = match kind_of(&key) {
                Some(kind) => kind
                    .normalize(&value)
                    .map_err(|reason| ContextError::invalid_config(&key, &value, reason))?,
                None => value,
            };
            normalized.insert(key, value);
        }
        Ok(Self { values: normalized })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).map(|v| v == "true").unwrap_or(default)
    }

    fn get_parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    pub fn query_max_memory_per_node(&self) -> u64 {
        self.get_parsed(QUERY_MAX_MEMORY_PER_NODE, DEFAULT_QUERY_MAX_MEMORY_PER_NODE)
    }

    pub fn spill_enabled(&self) -> bool {
        self.get_bool(SPILL_ENABLED, false)
    }

    pub fn join_spill_enabled(&self) -> bool {
        self.spill_enabled() && self.get_bool(JOIN_SPILL_ENABLED, true)
    }

    pub fn max_spill_level(&self) -> u32 {
        self.get_parsed(MAX_SPILL_LEVEL, DEFAULT_MAX_SPILL_LEVEL)
    }

    pub fn max_output_batch_rows(&self) -> u32 {
        self.get_parsed(MAX_OUTPUT_BATCH_ROWS, DEFAULT_MAX_OUTPUT_BATCH_ROWS)
    }

    pub fn session_timezone_key(&self) -> Option<i16> {
        self.get(SESSION_TIMEZONE_KEY).and_then(|v| v.parse().ok())
    }
}
