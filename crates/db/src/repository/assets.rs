//! Asset CRUD operations.

use sqlx::SqlitePool;

use crate::{models::AssetRow, DbError};

const SELECT_ASSET: &str = r#"
    SELECT database_id, asset_id, asset_name, description, asset_type, is_distributable,
           current_version_id, preview_location, gltf_location, laz_location,
           archived, created_at
    FROM assets
"#;

/// Insert a fully-populated asset row.
pub async fn insert_asset(pool: &SqlitePool, asset: &AssetRow) -> Result<AssetRow, DbError> {
    sqlx::query(
        r#"
        INSERT INTO assets
            (database_id, asset_id, asset_name, description, asset_type, is_distributable,
             current_version_id, preview_location, gltf_location, laz_location,
             archived, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(asset.database_id.as_str())
    .bind(asset.asset_id.as_str())
    .bind(asset.asset_name.as_str())
    .bind(asset.description.as_str())
    .bind(asset.asset_type.as_str())
    .bind(asset.is_distributable)
    .bind(asset.current_version_id.as_deref())
    .bind(asset.preview_location.as_deref())
    .bind(asset.gltf_location.as_deref())
    .bind(asset.laz_location.as_deref())
    .bind(asset.archived)
    .bind(asset.created_at)
    .execute(pool)
    .await?;

    get_asset(pool, &asset.database_id, &asset.asset_id).await
}

/// Fetch an asset, archived or not. `None` if it has never existed.
pub async fn find_asset(
    pool: &SqlitePool,
    database_id: &str,
    asset_id: &str,
) -> Result<Option<AssetRow>, DbError> {
    let sql = format!("{SELECT_ASSET} WHERE database_id = ? AND asset_id = ?");
    let row = sqlx::query_as::<_, AssetRow>(&sql)
        .bind(database_id)
        .bind(asset_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetch an asset by its composite key.
pub async fn get_asset(
    pool: &SqlitePool,
    database_id: &str,
    asset_id: &str,
) -> Result<AssetRow, DbError> {
    find_asset(pool, database_id, asset_id)
        .await?
        .ok_or(DbError::NotFound)
}

/// All assets of one database, ordered by name.
pub async fn list_assets(
    pool: &SqlitePool,
    database_id: &str,
    include_archived: bool,
) -> Result<Vec<AssetRow>, DbError> {
    let sql = format!(
        "{SELECT_ASSET} WHERE database_id = ? AND (archived = 0 OR ?) ORDER BY asset_name, asset_id"
    );
    let rows = sqlx::query_as::<_, AssetRow>(&sql)
        .bind(database_id)
        .bind(include_archived)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Flip the soft-delete flag. Returns `DbError::NotFound` if no row matched.
pub async fn set_asset_archived(
    pool: &SqlitePool,
    database_id: &str,
    asset_id: &str,
    archived: bool,
) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE assets SET archived = ? WHERE database_id = ? AND asset_id = ?")
            .bind(archived)
            .bind(database_id)
            .bind(asset_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Permanently delete an asset together with every link that touches it and
/// the metadata of those links, in a single transaction.
///
/// Returns the number of links removed, or `DbError::NotFound` if the asset
/// does not exist (nothing is deleted in that case).
pub async fn delete_asset_cascade(
    pool: &SqlitePool,
    database_id: &str,
    asset_id: &str,
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM asset_link_metadata
        WHERE asset_link_id IN (
            SELECT asset_link_id FROM asset_links
            WHERE (from_database_id = ?1 AND from_asset_id = ?2)
               OR (to_database_id = ?1 AND to_asset_id = ?2)
        )
        "#,
    )
    .bind(database_id)
    .bind(asset_id)
    .execute(&mut *tx)
    .await?;

    let links = sqlx::query(
        r#"
        DELETE FROM asset_links
        WHERE (from_database_id = ?1 AND from_asset_id = ?2)
           OR (to_database_id = ?1 AND to_asset_id = ?2)
        "#,
    )
    .bind(database_id)
    .bind(asset_id)
    .execute(&mut *tx)
    .await?;

    let asset = sqlx::query("DELETE FROM assets WHERE database_id = ? AND asset_id = ?")
        .bind(database_id)
        .bind(asset_id)
        .execute(&mut *tx)
        .await?;

    if asset.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(DbError::NotFound);
    }

    tx.commit().await?;
    Ok(links.rows_affected())
}
