//! Asset link (graph edge) operations.
//!
//! Edges are queryable from both endpoints through the `from` and `to`
//! composite indexes.

use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::{
    models::{AssetLinkRow, RelationshipType},
    DbError,
};

const SELECT_LINK: &str = r#"
    SELECT asset_link_id, from_database_id, from_asset_id, to_database_id, to_asset_id,
           relationship_type, asset_link_alias_id, tags, created_at
    FROM asset_links
"#;

/// Insert a fully-populated link row.
pub async fn insert_link(pool: &SqlitePool, link: &AssetLinkRow) -> Result<AssetLinkRow, DbError> {
    sqlx::query(
        r#"
        INSERT INTO asset_links
            (asset_link_id, from_database_id, from_asset_id, to_database_id, to_asset_id,
             relationship_type, asset_link_alias_id, tags, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(link.asset_link_id.as_str())
    .bind(link.from_database_id.as_str())
    .bind(link.from_asset_id.as_str())
    .bind(link.to_database_id.as_str())
    .bind(link.to_asset_id.as_str())
    .bind(link.relationship_type)
    .bind(link.asset_link_alias_id.as_deref())
    .bind(&link.tags)
    .bind(link.created_at)
    .execute(pool)
    .await?;

    get_link(pool, &link.asset_link_id).await
}

/// Fetch a single link by its ID.
pub async fn get_link(pool: &SqlitePool, asset_link_id: &str) -> Result<AssetLinkRow, DbError> {
    let sql = format!("{SELECT_LINK} WHERE asset_link_id = ?");
    sqlx::query_as::<_, AssetLinkRow>(&sql)
        .bind(asset_link_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Links whose `from` side is the given asset.
pub async fn links_from(
    pool: &SqlitePool,
    database_id: &str,
    asset_id: &str,
) -> Result<Vec<AssetLinkRow>, DbError> {
    let sql = format!(
        "{SELECT_LINK} WHERE from_database_id = ? AND from_asset_id = ? ORDER BY created_at, asset_link_id"
    );
    let rows = sqlx::query_as::<_, AssetLinkRow>(&sql)
        .bind(database_id)
        .bind(asset_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Links whose `to` side is the given asset.
pub async fn links_to(
    pool: &SqlitePool,
    database_id: &str,
    asset_id: &str,
) -> Result<Vec<AssetLinkRow>, DbError> {
    let sql = format!(
        "{SELECT_LINK} WHERE to_database_id = ? AND to_asset_id = ? ORDER BY created_at, asset_link_id"
    );
    let rows = sqlx::query_as::<_, AssetLinkRow>(&sql)
        .bind(database_id)
        .bind(asset_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Links of one relationship type going exactly from `from` to `to`.
pub async fn links_between(
    pool: &SqlitePool,
    from: (&str, &str),
    to: (&str, &str),
    relationship_type: RelationshipType,
) -> Result<Vec<AssetLinkRow>, DbError> {
    let sql = format!(
        r#"{SELECT_LINK}
        WHERE from_database_id = ? AND from_asset_id = ?
          AND to_database_id = ? AND to_asset_id = ?
          AND relationship_type = ?"#
    );
    let rows = sqlx::query_as::<_, AssetLinkRow>(&sql)
        .bind(from.0)
        .bind(from.1)
        .bind(to.0)
        .bind(to.1)
        .bind(relationship_type)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Number of links touching the asset on either side.
pub async fn count_links_for_asset(
    pool: &SqlitePool,
    database_id: &str,
    asset_id: &str,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM asset_links
        WHERE (from_database_id = ?1 AND from_asset_id = ?2)
           OR (to_database_id = ?1 AND to_asset_id = ?2)
        "#,
    )
    .bind(database_id)
    .bind(asset_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Replace the tag list of a link.
pub async fn update_link_tags(
    pool: &SqlitePool,
    asset_link_id: &str,
    tags: &[String],
) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE asset_links SET tags = ? WHERE asset_link_id = ?")
        .bind(Json(tags))
        .bind(asset_link_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Delete a link and all of its metadata rows in one transaction.
///
/// Returns the number of metadata rows removed alongside the link, or
/// `DbError::NotFound` if the link does not exist.
pub async fn delete_link_cascade(pool: &SqlitePool, asset_link_id: &str) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let metadata = sqlx::query("DELETE FROM asset_link_metadata WHERE asset_link_id = ?")
        .bind(asset_link_id)
        .execute(&mut *tx)
        .await?;

    let link = sqlx::query("DELETE FROM asset_links WHERE asset_link_id = ?")
        .bind(asset_link_id)
        .execute(&mut *tx)
        .await?;

    if link.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(DbError::NotFound);
    }

    tx.commit().await?;
    Ok(metadata.rows_affected())
}
