//! Per-link metadata rows, keyed by `(asset_link_id, metadata_key)`.

use sqlx::SqlitePool;

use crate::{
    models::{AssetLinkMetadataRow, MetadataValueType},
    DbError,
};

/// Insert a metadata entry. A duplicate key surfaces as a unique violation.
pub async fn insert_metadata(
    pool: &SqlitePool,
    entry: &AssetLinkMetadataRow,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO asset_link_metadata
            (asset_link_id, metadata_key, metadata_value, metadata_value_type)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(entry.asset_link_id.as_str())
    .bind(entry.metadata_key.as_str())
    .bind(entry.metadata_value.as_str())
    .bind(entry.metadata_value_type)
    .execute(pool)
    .await?;

    Ok(())
}

/// All metadata of one link, ordered by key.
pub async fn list_metadata(
    pool: &SqlitePool,
    asset_link_id: &str,
) -> Result<Vec<AssetLinkMetadataRow>, DbError> {
    let rows = sqlx::query_as::<_, AssetLinkMetadataRow>(
        r#"
        SELECT asset_link_id, metadata_key, metadata_value, metadata_value_type
        FROM asset_link_metadata
        WHERE asset_link_id = ?
        ORDER BY metadata_key
        "#,
    )
    .bind(asset_link_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Overwrite the value and type of an existing entry.
pub async fn update_metadata(
    pool: &SqlitePool,
    asset_link_id: &str,
    metadata_key: &str,
    metadata_value: &str,
    metadata_value_type: MetadataValueType,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE asset_link_metadata
        SET metadata_value = ?, metadata_value_type = ?
        WHERE asset_link_id = ? AND metadata_key = ?
        "#,
    )
    .bind(metadata_value)
    .bind(metadata_value_type)
    .bind(asset_link_id)
    .bind(metadata_key)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Delete one entry. Returns `DbError::NotFound` if no row was deleted.
pub async fn delete_metadata(
    pool: &SqlitePool,
    asset_link_id: &str,
    metadata_key: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "DELETE FROM asset_link_metadata WHERE asset_link_id = ? AND metadata_key = ?",
    )
    .bind(asset_link_id)
    .bind(metadata_key)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Number of metadata rows still pointing at `asset_link_id`.
pub async fn count_metadata(pool: &SqlitePool, asset_link_id: &str) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM asset_link_metadata WHERE asset_link_id = ?",
    )
    .bind(asset_link_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
