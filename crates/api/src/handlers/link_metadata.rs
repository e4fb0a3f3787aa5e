use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use db::models::{AssetLinkMetadataRow, MetadataValueType};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetadataDto {
    pub metadata_key: String,
    #[serde(default)]
    pub metadata_value: String,
    /// Parsed case-insensitively; `string` when omitted.
    #[serde(default = "default_value_type")]
    pub metadata_value_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetadataDto {
    #[serde(default)]
    pub metadata_value: String,
    #[serde(default = "default_value_type")]
    pub metadata_value_type: String,
}

fn default_value_type() -> String {
    "string".to_owned()
}

fn parse_type(raw: &str) -> Result<MetadataValueType, ApiError> {
    raw.parse().map_err(ApiError::BadRequest)
}

pub async fn list(
    Path(asset_link_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AssetLinkMetadataRow>>> {
    Ok(Json(state.metadata.list(&asset_link_id).await?))
}

pub async fn create(
    Path(asset_link_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<CreateMetadataDto>,
) -> ApiResult<(StatusCode, Json<AssetLinkMetadataRow>)> {
    let value_type = parse_type(&payload.metadata_value_type)?;
    let row = state
        .metadata
        .create(
            &asset_link_id,
            &payload.metadata_key,
            &payload.metadata_value,
            value_type,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update(
    Path((asset_link_id, metadata_key)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateMetadataDto>,
) -> ApiResult<Json<AssetLinkMetadataRow>> {
    let value_type = parse_type(&payload.metadata_value_type)?;
    let row = state
        .metadata
        .update(&asset_link_id, &metadata_key, &payload.metadata_value, value_type)
        .await?;
    Ok(Json(row))
}

pub async fn delete(
    Path((asset_link_id, metadata_key)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<StatusCode> {
    state.metadata.delete(&asset_link_id, &metadata_key).await?;
    Ok(StatusCode::NO_CONTENT)
}
