use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use db::models::WorkflowRow;
use engine::models::NewWorkflow;

use super::ListQuery;
use crate::error::ApiResult;
use crate::AppState;

/// The database's workflows followed by GLOBAL's, without duplicates.
pub async fn list(
    Path(database_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<WorkflowRow>>> {
    Ok(Json(
        state
            .catalog
            .list_workflows(&database_id, query.include_archived)
            .await?,
    ))
}

pub async fn create(
    Path(database_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<NewWorkflow>,
) -> ApiResult<(StatusCode, Json<WorkflowRow>)> {
    let row = state.catalog.create_workflow(&database_id, payload).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn archive(
    Path((database_id, workflow_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<StatusCode> {
    state.catalog.archive_workflow(&database_id, &workflow_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
