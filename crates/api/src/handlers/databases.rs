use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use db::models::DatabaseRow;

use super::ListQuery;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseDto {
    pub database_id: String,
    #[serde(default)]
    pub description: String,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<DatabaseRow>>> {
    Ok(Json(state.catalog.list_databases(query.include_archived).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateDatabaseDto>,
) -> ApiResult<(StatusCode, Json<DatabaseRow>)> {
    let row = state
        .catalog
        .create_database(&payload.database_id, &payload.description)
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn get(
    Path(database_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<DatabaseRow>> {
    Ok(Json(state.catalog.get_database(&database_id).await?))
}

pub async fn archive(
    Path(database_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<StatusCode> {
    state.catalog.archive_database(&database_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
