//! Route handlers, one module per resource.

pub mod asset_links;
pub mod assets;
pub mod databases;
pub mod executions;
pub mod link_metadata;
pub mod pipelines;
pub mod workflows;

use serde::Deserialize;

/// `?includeArchived=true` on listing endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub include_archived: bool,
}
