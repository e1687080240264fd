//! 查询上下文错误类型
//!
//! 缓存本身不会失败：过期条目按未命中处理，容量不足时扩容。
//! 对外可见的错误只来自请求解析和上下文构造阶段，且只影响当前请求。

use thiserror::Error;

/// 查询上下文操作结果类型
pub type ContextResult<T> = Result<T, ContextError>;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 请求内容有误，调用方修正后可重试
    Request,
    /// 工作节点内部错误
    Internal,
}

/// 查询上下文错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    #[error("无效的任务ID: {0}")]
    InvalidTaskId(String),

    #[error("无效的会话属性 {name}={value}: {reason}")]
    InvalidSessionProperty {
        name: String,
        value: String,
        reason: String,
    },

    #[error("无效的查询配置 {key}={value}: {reason}")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    #[error("执行器创建失败: {0}")]
    ExecutorBuild(String),

    #[error("配置文件错误: {0}")]
    Config(String),
}

impl ContextError {
    /// 获取错误分类
    pub fn category(&self) -> ErrorCategory {
        match self {
            ContextError::InvalidTaskId(_)
            | ContextError::InvalidSessionProperty { .. }
            | ContextError::InvalidConfig { .. } => ErrorCategory::Request,
            ContextError::ExecutorBuild(_) | ContextError::Config(_) => ErrorCategory::Internal,
        }
    }

    /// 是否为请求错误
    pub fn is_request_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Request)
    }

    pub fn invalid_task_id(msg: impl Into<String>) -> Self {
        Self::InvalidTaskId(msg.into())
    }

    pub fn invalid_session_property(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidSessionProperty {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for ContextError {
    fn from(err: toml::de::Error) -> Self {
        ContextError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ContextError {
    fn from(err: toml::ser::Error) -> Self {
        ContextError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ContextError {
    fn from(err: std::io::Error) -> Self {
        ContextError::Config(format!("IO错误: {}", err))
    }
}
