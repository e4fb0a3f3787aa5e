//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use engine::EngineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Request shape problems caught before reaching the engine.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Engine(e) => match e {
                EngineError::InvalidField { .. }
                | EngineError::InvalidMetadataValue { .. }
                | EngineError::ReservedDatabase(_)
                | EngineError::SelfLink
                | EngineError::UnknownAssetReference { .. }
                | EngineError::LinkLimitExceeded { .. }
                | EngineError::CycleDetected
                | EngineError::PipelineDisabled(_) => StatusCode::BAD_REQUEST,

                EngineError::NotFound(_) => StatusCode::NOT_FOUND,

                EngineError::DuplicateLink(_)
                | EngineError::DuplicateMetadataKey(_)
                | EngineError::AlreadyExists(_)
                | EngineError::ExecutionAlreadyRunning
                | EngineError::InvalidTransition { .. } => StatusCode::CONFLICT,

                EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {self}");
            "internal server error".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
