//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models. They are serialised straight out of the
//! REST layer, so field names render in camelCase. Validation and graph
//! rules live in the `engine` crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Reserved database ID for pipelines and workflows shared by every database.
pub const GLOBAL_DATABASE_ID: &str = "GLOBAL";

// ---------------------------------------------------------------------------
// databases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseRow {
    pub database_id: String,
    pub description: String,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// assets
// ---------------------------------------------------------------------------

/// A persisted asset. Keyed by `(database_id, asset_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssetRow {
    pub database_id: String,
    pub asset_id: String,
    pub asset_name: String,
    pub description: String,
    pub asset_type: String,
    pub is_distributable: bool,
    /// Pointer to the current version; versions themselves are stored elsewhere.
    pub current_version_id: Option<String>,
    pub preview_location: Option<String>,
    pub gltf_location: Option<String>,
    pub laz_location: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// asset_links
// ---------------------------------------------------------------------------

/// Kind of edge between two assets.
///
/// For `ParentChild` the `from` side is the parent and the `to` side the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub enum RelationshipType {
    Related,
    ParentChild,
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Related => write!(f, "related"),
            Self::ParentChild => write!(f, "parentChild"),
        }
    }
}

/// A persisted directed edge between two assets.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssetLinkRow {
    pub asset_link_id: String,
    pub from_database_id: String,
    pub from_asset_id: String,
    pub to_database_id: String,
    pub to_asset_id: String,
    pub relationship_type: RelationshipType,
    pub asset_link_alias_id: Option<String>,
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// asset_link_metadata
// ---------------------------------------------------------------------------

/// Declared type of a metadata value. Values are always stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MetadataValueType {
    String,
    MultilineString,
    InlineControlledList,
    Number,
    Boolean,
    Date,
    Json,
    Xyz,
    Wxyz,
    #[serde(rename = "matrix4x4")]
    #[sqlx(rename = "matrix4x4")]
    Matrix4x4,
    Geopoint,
    Geojson,
    Lla,
}

impl MetadataValueType {
    pub const ALL: [Self; 13] = [
        Self::String,
        Self::MultilineString,
        Self::InlineControlledList,
        Self::Number,
        Self::Boolean,
        Self::Date,
        Self::Json,
        Self::Xyz,
        Self::Wxyz,
        Self::Matrix4x4,
        Self::Geopoint,
        Self::Geojson,
        Self::Lla,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::MultilineString => "multiline_string",
            Self::InlineControlledList => "inline_controlled_list",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Json => "json",
            Self::Xyz => "xyz",
            Self::Wxyz => "wxyz",
            Self::Matrix4x4 => "matrix4x4",
            Self::Geopoint => "geopoint",
            Self::Geojson => "geojson",
            Self::Lla => "lla",
        }
    }
}

impl std::fmt::Display for MetadataValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive: `"XYZ"` and `"xyz"` are the same type.
impl std::str::FromStr for MetadataValueType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| {
                let supported: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                format!(
                    "invalid metadata value type: {s}. Supported types are: {}",
                    supported.join(", ")
                )
            })
    }
}

/// One key/value entry attached to an asset link.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssetLinkMetadataRow {
    pub asset_link_id: String,
    pub metadata_key: String,
    pub metadata_value: String,
    pub metadata_value_type: MetadataValueType,
}

// ---------------------------------------------------------------------------
// pipelines
// ---------------------------------------------------------------------------

/// Compute backing a pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ExecutionType {
    Lambda,
    Batch,
}

/// A persisted pipeline definition. Keyed by `(database_id, pipeline_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRow {
    pub database_id: String,
    pub pipeline_id: String,
    pub description: String,
    /// File type the pipeline consumes, e.g. `.obj`.
    pub asset_type: String,
    pub output_type: String,
    pub execution_type: ExecutionType,
    pub wait_for_callback: bool,
    pub task_timeout_seconds: Option<i64>,
    pub task_heartbeat_timeout_seconds: Option<i64>,
    pub enabled: bool,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// workflows
// ---------------------------------------------------------------------------

/// Reference from a workflow to one of its pipeline steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRef {
    pub database_id: String,
    pub pipeline_id: String,
}

/// A persisted workflow definition. Keyed by `(database_id, workflow_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRow {
    pub database_id: String,
    pub workflow_id: String,
    pub description: String,
    /// Ordered pipeline steps.
    pub pipelines: Json<Vec<PipelineRef>>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// workflow_executions
// ---------------------------------------------------------------------------

/// Possible statuses for a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
    Canceled,
}

impl ExecutionStatus {
    /// Everything but `Running` is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed => write!(f, "FAILED"),
            Self::TimedOut => write!(f, "TIMED_OUT"),
            Self::Aborted => write!(f, "ABORTED"),
            Self::Canceled => write!(f, "CANCELED"),
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING"   => Ok(Self::Running),
            "SUCCEEDED" => Ok(Self::Succeeded),
            "FAILED"    => Ok(Self::Failed),
            "TIMED_OUT" => Ok(Self::TimedOut),
            "ABORTED"   => Ok(Self::Aborted),
            "CANCELED"  => Ok(Self::Canceled),
            other       => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// A persisted workflow execution row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecutionRow {
    pub workflow_database_id: String,
    pub workflow_id: String,
    pub execution_id: String,
    /// Database of the asset the workflow ran against.
    pub database_id: String,
    pub asset_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_value_type_parses_case_insensitively() {
        assert_eq!("XYZ".parse::<MetadataValueType>(), Ok(MetadataValueType::Xyz));
        assert_eq!(
            "Matrix4x4".parse::<MetadataValueType>(),
            Ok(MetadataValueType::Matrix4x4)
        );
        assert!("quaternion".parse::<MetadataValueType>().is_err());
    }

    #[test]
    fn metadata_value_type_serde_names_match_as_str() {
        for t in MetadataValueType::ALL {
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, serde_json::Value::String(t.as_str().to_string()));
        }
    }

    #[test]
    fn only_running_is_non_terminal() {
        assert!(!ExecutionStatus::Running.is_terminal());
        for s in ["SUCCEEDED", "FAILED", "TIMED_OUT", "ABORTED", "CANCELED"] {
            let status: ExecutionStatus = s.parse().unwrap();
            assert!(status.is_terminal(), "{s} should be terminal");
            assert_eq!(status.to_string(), s);
        }
    }

    #[test]
    fn relationship_type_uses_camel_case_on_the_wire() {
        let json = serde_json::to_string(&RelationshipType::ParentChild).unwrap();
        assert_eq!(json, "\"parentChild\"");
    }
}
