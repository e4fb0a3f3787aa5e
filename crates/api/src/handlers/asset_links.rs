use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use db::models::AssetLinkRow;
use engine::{AssetLinks, NewAssetLink};

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinksQuery {
    #[serde(default)]
    pub child_tree_view: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagsDto {
    pub tags: Vec<String>,
}

pub async fn list_for_asset(
    Path((database_id, asset_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Query(query): Query<LinksQuery>,
) -> ApiResult<Json<AssetLinks>> {
    let links = state
        .links
        .list_links(&database_id, &asset_id, query.child_tree_view)
        .await?;
    Ok(Json(links))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NewAssetLink>,
) -> ApiResult<(StatusCode, Json<AssetLinkRow>)> {
    let link = state.links.create_link(payload).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn get(
    Path(asset_link_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<AssetLinkRow>> {
    Ok(Json(state.links.get_link(&asset_link_id).await?))
}

pub async fn update(
    Path(asset_link_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateTagsDto>,
) -> ApiResult<Json<AssetLinkRow>> {
    Ok(Json(
        state
            .links
            .update_link_tags(&asset_link_id, payload.tags)
            .await?,
    ))
}

pub async fn delete(
    Path(asset_link_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<StatusCode> {
    state.links.delete_link(&asset_link_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
