//! 查询与任务标识符
//!
//! 任务ID的文本形式为 `<queryId>.<stageId>.<stageExecutionId>.<taskId>.<attempt>`，
//! 查询ID就是第一段。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{ContextError, ContextResult};

/// 查询ID，同一查询的所有任务共享
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for QueryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// 任务ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId {
    query_id: QueryId,
    stage_id: u32,
    stage_execution_id: u32,
    id: u32,
    attempt_number: u32,
}

impl TaskId {
    pub fn new(
        query_id: QueryId,
        stage_id: u32,
        stage_execution_id: u32,
        id: u32,
        attempt_number: u32,
    ) -> Self {
        Self {
            query_id,
            stage_id,
            stage_execution_id,
            id,
            attempt_number,
        }
    }

    /// 解析任务ID文本
    pub fn parse(text: &str) -> ContextResult<Self> {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != 5 {
            return Err(ContextError::invalid_task_id(format!(
                "{}: 应包含5段，实际为{}段",
                text,
                parts.len()
            )));
        }
        if parts[0].is_empty() {
            return Err(ContextError::invalid_task_id(format!("{}: 查询ID为空", text)));
        }

        let number = |idx: usize, what: &str| -> ContextResult<u32> {
            parts[idx].parse::<u32>().map_err(|_| {
                ContextError::invalid_task_id(format!("{}: {} '{}' 不是非负整数", text, what, parts[idx]))
            })
        };

        Ok(Self {
            query_id: QueryId::new(parts[0]),
            stage_id: number(1, "stageId")?,
            stage_execution_id: number(2, "stageExecutionId")?,
            id: number(3, "taskId")?,
            attempt_number: number(4, "attemptNumber")?,
        })
    }

    /// 派生所属查询ID
    pub fn query_id(&self) -> &QueryId {
        &self.query_id
    }

    pub fn stage_id(&self) -> u32 {
        self.stage_id
    }

    pub fn stage_execution_id(&self) -> u32 {
        self.stage_execution_id
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}",
            self.query_id, self.stage_id, self.stage_execution_id, self.id, self.attempt_number
        )
    }
}

impl FromStr for TaskId {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TaskId {
    type Error = ContextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TaskId> for String {
    fn from(task_id: TaskId) -> Self {
        task_id.to_string()
    }
}
