//! Shared fixtures for the engine's unit tests.

use chrono::Utc;

use db::models::AssetRow;
use db::repository::{assets, databases};
use db::DbPool;

pub async fn setup() -> DbPool {
    db::pool::memory_pool().await.expect("in-memory pool")
}

pub async fn seed_database(pool: &DbPool, database_id: &str) {
    databases::create_database(pool, database_id, "test database")
        .await
        .expect("seed database");
}

pub async fn seed_asset(pool: &DbPool, database_id: &str, asset_id: &str) {
    let row = AssetRow {
        database_id: database_id.to_owned(),
        asset_id: asset_id.to_owned(),
        asset_name: asset_id.to_uppercase(),
        description: String::new(),
        asset_type: ".glb".to_owned(),
        is_distributable: false,
        current_version_id: None,
        preview_location: None,
        gltf_location: None,
        laz_location: None,
        archived: false,
        created_at: Utc::now(),
    };
    assets::insert_asset(pool, &row).await.expect("seed asset");
}
