use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use db::models::AssetRow;
use engine::models::NewAsset;

use super::ListQuery;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub permanent: bool,
}

pub async fn list(
    Path(database_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<AssetRow>>> {
    Ok(Json(
        state
            .catalog
            .list_assets(&database_id, query.include_archived)
            .await?,
    ))
}

pub async fn create(
    Path(database_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<NewAsset>,
) -> ApiResult<(StatusCode, Json<AssetRow>)> {
    let row = state.catalog.create_asset(&database_id, payload).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn get(
    Path((database_id, asset_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<Json<AssetRow>> {
    Ok(Json(state.catalog.get_asset(&database_id, &asset_id).await?))
}

/// Archives by default; `?permanent=true` deletes the asset and its links.
pub async fn delete(
    Path((database_id, asset_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<StatusCode> {
    if query.permanent {
        state.catalog.delete_asset(&database_id, &asset_id).await?;
    } else {
        state.catalog.archive_asset(&database_id, &asset_id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore(
    Path((database_id, asset_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<Json<AssetRow>> {
    Ok(Json(state.catalog.restore_asset(&database_id, &asset_id).await?))
}
