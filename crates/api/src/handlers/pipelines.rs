use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use db::models::PipelineRow;
use engine::models::NewPipeline;

use super::ListQuery;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EnabledDto {
    pub enabled: bool,
}

/// The database's pipelines followed by GLOBAL's.
pub async fn list(
    Path(database_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<PipelineRow>>> {
    Ok(Json(
        state
            .catalog
            .list_pipelines(&database_id, query.include_archived)
            .await?,
    ))
}

pub async fn create(
    Path(database_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<NewPipeline>,
) -> ApiResult<(StatusCode, Json<PipelineRow>)> {
    let row = state.catalog.create_pipeline(&database_id, payload).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn set_enabled(
    Path((database_id, pipeline_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(payload): Json<EnabledDto>,
) -> ApiResult<Json<PipelineRow>> {
    let row = state
        .catalog
        .set_pipeline_enabled(&database_id, &pipeline_id, payload.enabled)
        .await?;
    Ok(Json(row))
}
