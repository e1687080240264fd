//! 任务请求中携带的会话信息

pub mod properties;

pub use properties::{SessionProperties, SessionProperty};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 协调节点下发的会话表示
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionRepresentation {
    pub query_id: String,
    pub user: String,
    pub source: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    /// 时区键，0 表示未设置
    pub time_zone_key: i16,
    /// 查询开始时间（毫秒时间戳）
    pub start_time: i64,
    /// 系统级会话属性
    pub system_properties: HashMap<String, String>,
    /// 按 catalog 分组的连接器会话属性
    pub catalog_properties: HashMap<String, HashMap<String, String>>,
}

impl SessionRepresentation {
    pub fn new(query_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn with_system_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.system_properties.insert(name.into(), value.into());
        self
    }

    pub fn with_catalog_property(
        mut self,
        catalog: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.catalog_properties
            .entry(catalog.into())
            .or_default()
            .insert(name.into(), value.into());
        self
    }

    pub fn with_time_zone_key(mut self, time_zone_key: i16) -> Self {
        self.time_zone_key = time_zone_key;
        self
    }

    pub fn with_start_time(mut self, start_time: i64) -> Self {
        self.start_time = start_time;
        self
    }
}

/// 任务更新请求中与上下文创建相关的部分
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskUpdateRequest {
    pub session: SessionRepresentation,
    /// 附加凭据，合并到每个 catalog 的连接器配置
    pub extra_credentials: HashMap<String, String>,
}

impl TaskUpdateRequest {
    pub fn new(session: SessionRepresentation) -> Self {
        Self {
            session,
            extra_credentials: HashMap::new(),
        }
    }

    pub fn with_extra_credential(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_credentials.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "session": {
                "queryId": "20240101_000000_00001_abcde",
                "user": "alice",
                "timeZoneKey": 2079,
                "startTime": 1704067200000,
                "systemProperties": { "native_spill_enabled": "true" },
                "catalogProperties": { "hive": { "orc_use_column_names": "true" } }
            },
            "extraCredentials": { "hive.token": "abc" }
        }"#;

        let request: TaskUpdateRequest = serde_json::from_str(json).expect("解析请求失败");
        let session = &request.session;
        assert_eq!(session.user, "alice");
        assert_eq!(session.time_zone_key, 2079);
        assert_eq!(session.catalog, None);
        assert_eq!(
            session.system_properties.get("native_spill_enabled"),
            Some(&"true".to_string())
        );
        assert_eq!(
            session.catalog_properties["hive"].get("orc_use_column_names"),
            Some(&"true".to_string())
        );
        assert_eq!(request.extra_credentials.get("hive.token"), Some(&"abc".to_string()));
    }

    #[test]
    fn test_builder() {
        let session = SessionRepresentation::new("q1", "bob")
            .with_system_property("native_max_spill_level", "2")
            .with_catalog_property("tpch", "split_count", "8")
            .with_catalog_property("tpch", "scale", "1");
        assert_eq!(session.system_properties.len(), 1);
        assert_eq!(session.catalog_properties["tpch"].len(), 2);
    }
}
