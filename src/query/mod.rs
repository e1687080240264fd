// Query module for the execution worker
//
// - Per-query execution contexts and the manager that shares them across tasks
// - Session representation carried by task update requests

pub mod context;
pub mod session;

pub use context::{QueryContextManager, QueryCtx};
pub use session::{SessionRepresentation, TaskUpdateRequest};
