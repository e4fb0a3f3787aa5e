//! Domain request and view types.
//!
//! Stored records are the row structs of the `db` crate; the types here are
//! what callers hand to the engine (`New*`) and what graph queries return.

use serde::{Deserialize, Serialize};

use db::models::{ExecutionType, PipelineRef, RelationshipType};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Composite key of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetKey {
    pub database_id: String,
    pub asset_id: String,
}

impl AssetKey {
    pub fn new(database_id: impl Into<String>, asset_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            asset_id: asset_id.into(),
        }
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.database_id, self.asset_id)
    }
}

/// Full key of a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionKey {
    pub workflow_database_id: String,
    pub workflow_id: String,
    pub execution_id: String,
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Fields supplied when registering an asset. The database comes from the
/// request path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAsset {
    pub asset_id: String,
    pub asset_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub asset_type: String,
    #[serde(default)]
    pub is_distributable: bool,
    #[serde(default)]
    pub current_version_id: Option<String>,
    #[serde(default)]
    pub preview_location: Option<String>,
    #[serde(default)]
    pub gltf_location: Option<String>,
    #[serde(default)]
    pub laz_location: Option<String>,
}

// ---------------------------------------------------------------------------
// Asset links
// ---------------------------------------------------------------------------

/// A link creation request. For `parentChild`, `from` is the parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssetLink {
    pub from_database_id: String,
    pub from_asset_id: String,
    pub to_database_id: String,
    pub to_asset_id: String,
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub asset_link_alias_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewAssetLink {
    pub fn from_key(&self) -> AssetKey {
        AssetKey::new(&self.from_database_id, &self.from_asset_id)
    }

    pub fn to_key(&self) -> AssetKey {
        AssetKey::new(&self.to_database_id, &self.to_asset_id)
    }
}

/// The asset on the other end of a link, as seen from the queried asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAsset {
    pub asset_link_id: String,
    pub asset_id: String,
    pub asset_name: String,
    pub database_id: String,
    pub asset_link_alias_id: Option<String>,
}

/// A child in the descendant tree, with its own children nested inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTreeNode {
    #[serde(flatten)]
    pub asset: LinkedAsset,
    pub children: Vec<AssetTreeNode>,
}

/// Children are either the direct children or the full descendant tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildLinks {
    Flat(Vec<LinkedAsset>),
    Tree(Vec<AssetTreeNode>),
}

impl ChildLinks {
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(v) => v.len(),
            Self::Tree(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Links left out of a listing because the other asset is archived or gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenCounts {
    pub related: usize,
    pub parents: usize,
    pub children: usize,
}

/// Everything linked to one asset, grouped by relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetLinks {
    pub related: Vec<LinkedAsset>,
    pub parents: Vec<LinkedAsset>,
    pub children: ChildLinks,
    pub hidden: HiddenCounts,
}

// ---------------------------------------------------------------------------
// Pipelines & workflows
// ---------------------------------------------------------------------------

/// Fields supplied when registering a pipeline. The database comes from the
/// request path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPipeline {
    pub pipeline_id: String,
    #[serde(default)]
    pub description: String,
    pub asset_type: String,
    pub output_type: String,
    pub execution_type: ExecutionType,
    #[serde(default)]
    pub wait_for_callback: bool,
    #[serde(default)]
    pub task_timeout_seconds: Option<i64>,
    #[serde(default)]
    pub task_heartbeat_timeout_seconds: Option<i64>,
}

/// Fields supplied when registering a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkflow {
    pub workflow_id: String,
    #[serde(default)]
    pub description: String,
    pub pipelines: Vec<PipelineRef>,
}

// ---------------------------------------------------------------------------
// Executions
// ---------------------------------------------------------------------------

/// Request to run a workflow against an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExecution {
    pub database_id: String,
    pub asset_id: String,
    pub workflow_id: String,
    /// Where the workflow is stored; defaults to the asset's database with a
    /// fallback to `GLOBAL`.
    #[serde(default)]
    pub workflow_database_id: Option<String>,
}

/// The set of executions a watcher is interested in.
///
/// Without a `workflow_id`, every workflow visible from the asset's database
/// (its own plus `GLOBAL`) is included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchTarget {
    pub database_id: String,
    pub asset_id: String,
    pub workflow_id: Option<String>,
}
