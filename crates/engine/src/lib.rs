//! `engine` crate: domain rules of the asset registry.
//!
//! Covers validation, the asset link graph with its metadata, the workflow
//! catalog, and execution tracking.

pub mod models;
pub mod error;
pub mod validation;
pub mod links;
pub mod link_metadata;
pub mod catalog;
pub mod executions;
pub mod poller;

pub use models::{AssetKey, AssetLinks, ExecutionKey, NewAssetLink, StartExecution, WatchTarget};
pub use error::EngineError;
pub use links::{AssetLinkService, LinkConfig};
pub use link_metadata::LinkMetadataService;
pub use catalog::Catalog;
pub use executions::ExecutionService;
pub use poller::{ExecutionPoller, ExecutionStatusSource, PollConfig};

#[cfg(test)]
mod test_support;
