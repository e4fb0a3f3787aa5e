//! Repository functions: one function per database operation.
//!
//! Every function takes a `&DbPool` and returns a `Result<T, DbError>`.
//! No business logic, no validation, pure SQL.

pub mod databases;
pub mod assets;
pub mod asset_links;
pub mod link_metadata;
pub mod pipelines;
pub mod workflows;
pub mod executions;
