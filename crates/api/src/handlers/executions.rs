use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use db::models::{ExecutionStatus, WorkflowExecutionRow};
use engine::{ExecutionKey, StartExecution};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuery {
    /// Where the workflow lives; defaults to the asset's database, then GLOBAL.
    pub workflow_database_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusDto {
    pub status: String,
}

pub async fn start(
    Path((database_id, asset_id, workflow_id)): Path<(String, String, String)>,
    State(state): State<AppState>,
    Query(query): Query<StartQuery>,
) -> ApiResult<(StatusCode, Json<WorkflowExecutionRow>)> {
    let row = state
        .executions
        .start_execution(StartExecution {
            database_id,
            asset_id,
            workflow_id,
            workflow_database_id: query.workflow_database_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list(
    Path((database_id, asset_id, workflow_id)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<WorkflowExecutionRow>>> {
    Ok(Json(
        state
            .executions
            .list_executions(&database_id, &asset_id, &workflow_id)
            .await?,
    ))
}

pub async fn update_status(
    Path((workflow_database_id, workflow_id, execution_id)): Path<(String, String, String)>,
    State(state): State<AppState>,
    Json(payload): Json<StatusDto>,
) -> ApiResult<Json<WorkflowExecutionRow>> {
    let status: ExecutionStatus = payload.status.parse().map_err(ApiError::BadRequest)?;
    let key = ExecutionKey {
        workflow_database_id,
        workflow_id,
        execution_id,
    };
    Ok(Json(state.executions.update_execution_status(&key, status).await?))
}
