pub mod error;
pub mod ids;

// 错误和结果类型
pub use error::{ContextError, ContextResult, ErrorCategory};
pub use ids::{QueryId, TaskId};
