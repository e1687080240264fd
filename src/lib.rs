//! QueryContext - per-query execution context cache for a distributed SQL worker
//!
//! Every task of a query running on this worker shares one execution context.
//! The cache keyed by query id holds only weak references, so a context lives
//! exactly as long as some task still holds it.

pub mod cache;
pub mod config;
pub mod core;
pub mod query;
pub mod utils;
