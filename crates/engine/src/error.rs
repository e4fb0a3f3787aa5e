//! Engine-level error types.

use db::models::{ExecutionStatus, MetadataValueType};
use thiserror::Error;

/// Errors produced by the engine (validation, graph rules, persistence).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------

    /// A request field failed its format check.
    #[error("{field} is invalid: {message}")]
    InvalidField {
        field: String,
        message: String,
    },

    /// A metadata value does not match its declared type.
    #[error("metadataValue is not a valid {value_type}: {message}")]
    InvalidMetadataValue {
        value_type: MetadataValueType,
        message: String,
    },

    /// `GLOBAL` cannot be created, archived, or otherwise managed directly.
    #[error("database ID '{0}' is reserved")]
    ReservedDatabase(String),

    // ------ Link graph errors ------

    /// Both ends of the requested link are the same asset.
    #[error("cannot create asset link to the same asset")]
    SelfLink,

    /// A link endpoint references an asset that does not exist.
    #[error("asset '{database_id}/{asset_id}' does not exist ({side} side)")]
    UnknownAssetReference {
        database_id: String,
        asset_id: String,
        side: &'static str,
    },

    /// An equivalent link is already stored.
    #[error("{0}")]
    DuplicateLink(String),

    /// The parent-child link would close a loop.
    #[error("creating this parent-child relationship would create a cycle")]
    CycleDetected,

    /// An endpoint already carries the maximum number of links.
    #[error("asset '{database_id}/{asset_id}' exceeds the {limit} asset link total limit")]
    LinkLimitExceeded {
        database_id: String,
        asset_id: String,
        limit: usize,
    },

    /// Metadata keys are unique per link.
    #[error("metadata key '{0}' already exists on this asset link")]
    DuplicateMetadataKey(String),

    // ------ Catalog / execution errors ------

    /// A row that must not exist yet already does.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// A referenced row does not exist (or is archived where that matters).
    #[error("{0} not found")]
    NotFound(String),

    /// A workflow step points at a pipeline that is disabled.
    #[error("pipeline '{0}' is not enabled")]
    PipelineDisabled(String),

    /// At most one running execution per asset and workflow.
    #[error("workflow has a currently running execution on the asset")]
    ExecutionAlreadyRunning,

    /// Executions only move from RUNNING to a terminal status.
    #[error("cannot change execution status from {from} to {to}")]
    InvalidTransition {
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}

impl EngineError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_owned(),
            message: message.into(),
        }
    }

    /// Turn a repository `NotFound` into a named [`EngineError::NotFound`].
    pub(crate) fn not_found_or(err: db::DbError, what: String) -> Self {
        match err {
            db::DbError::NotFound => Self::NotFound(what),
            other => Self::Database(other),
        }
    }
}
