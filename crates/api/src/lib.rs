//! `api` crate: HTTP REST API layer over the engine.
//!
//! Exposes:
//!   /databases[/:databaseId]
//!   /databases/:databaseId/assets[/:assetId[/restore|/asset-links]]
//!   /asset-links[/:assetLinkId[/metadata[/:metadataKey]]]
//!   /databases/:databaseId/pipelines[/:pipelineId/enabled]
//!   /databases/:databaseId/workflows[/:workflowId]
//!   /databases/:databaseId/assets/:assetId/workflows/:workflowId[/executions]
//!   /workflows/:workflowDatabaseId/:workflowId/executions/:executionId/status

pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use db::DbPool;
use engine::{AssetLinkService, Catalog, ExecutionService, LinkConfig, LinkMetadataService};

use handlers::{asset_links, assets, databases, executions, link_metadata, pipelines, workflows};

pub use error::{ApiError, ApiResult};

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub bind: String,
    pub max_connections: u32,
    pub links: LinkConfig,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_owned(),
            max_connections: 10,
            links: LinkConfig::default(),
        }
    }
}

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub links: AssetLinkService,
    pub metadata: LinkMetadataService,
    pub executions: ExecutionService,
}

impl AppState {
    pub fn new(pool: DbPool, links: LinkConfig) -> Self {
        Self {
            catalog: Catalog::new(pool.clone()),
            links: AssetLinkService::new(pool.clone(), links),
            metadata: LinkMetadataService::new(pool.clone()),
            executions: ExecutionService::new(pool),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Databases & assets
        .route("/databases", get(databases::list).post(databases::create))
        .route(
            "/databases/:database_id",
            get(databases::get).delete(databases::archive),
        )
        .route(
            "/databases/:database_id/assets",
            get(assets::list).post(assets::create),
        )
        .route(
            "/databases/:database_id/assets/:asset_id",
            get(assets::get).delete(assets::delete),
        )
        .route(
            "/databases/:database_id/assets/:asset_id/restore",
            post(assets::restore),
        )
        // Link graph
        .route(
            "/databases/:database_id/assets/:asset_id/asset-links",
            get(asset_links::list_for_asset),
        )
        .route("/asset-links", post(asset_links::create))
        .route(
            "/asset-links/:asset_link_id",
            get(asset_links::get)
                .put(asset_links::update)
                .delete(asset_links::delete),
        )
        .route(
            "/asset-links/:asset_link_id/metadata",
            get(link_metadata::list).post(link_metadata::create),
        )
        .route(
            "/asset-links/:asset_link_id/metadata/:metadata_key",
            put(link_metadata::update).delete(link_metadata::delete),
        )
        // Pipelines & workflows
        .route(
            "/databases/:database_id/pipelines",
            get(pipelines::list).post(pipelines::create),
        )
        .route(
            "/databases/:database_id/pipelines/:pipeline_id/enabled",
            put(pipelines::set_enabled),
        )
        .route(
            "/databases/:database_id/workflows",
            get(workflows::list).post(workflows::create),
        )
        .route(
            "/databases/:database_id/workflows/:workflow_id",
            axum::routing::delete(workflows::archive),
        )
        // Executions
        .route(
            "/databases/:database_id/assets/:asset_id/workflows/:workflow_id",
            post(executions::start),
        )
        .route(
            "/databases/:database_id/assets/:asset_id/workflows/:workflow_id/executions",
            get(executions::list),
        )
        .route(
            "/workflows/:workflow_database_id/:workflow_id/executions/:execution_id/status",
            put(executions::update_status),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `config.bind` and serve until the process is stopped.
pub async fn serve(config: &ServeConfig, pool: DbPool) -> Result<(), std::io::Error> {
    let app = build_router(AppState::new(pool, config.links.clone()));
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}
