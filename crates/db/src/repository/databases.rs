//! Database (namespace) CRUD operations.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{models::DatabaseRow, DbError};

/// Insert a new database namespace.
pub async fn create_database(
    pool: &SqlitePool,
    database_id: &str,
    description: &str,
) -> Result<DatabaseRow, DbError> {
    let row = sqlx::query_as::<_, DatabaseRow>(
        r#"
        INSERT INTO databases (database_id, description, archived, created_at)
        VALUES (?, ?, 0, ?)
        RETURNING database_id, description, archived, created_at
        "#,
    )
    .bind(database_id)
    .bind(description)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a single database by its primary key.
pub async fn get_database(pool: &SqlitePool, database_id: &str) -> Result<DatabaseRow, DbError> {
    sqlx::query_as::<_, DatabaseRow>(
        "SELECT database_id, description, archived, created_at FROM databases WHERE database_id = ?",
    )
    .bind(database_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Return databases ordered by ID, optionally including archived ones.
pub async fn list_databases(
    pool: &SqlitePool,
    include_archived: bool,
) -> Result<Vec<DatabaseRow>, DbError> {
    let rows = sqlx::query_as::<_, DatabaseRow>(
        r#"
        SELECT database_id, description, archived, created_at
        FROM databases
        WHERE archived = 0 OR ?
        ORDER BY database_id
        "#,
    )
    .bind(include_archived)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Flip the soft-delete flag. Returns `DbError::NotFound` if no row matched.
pub async fn set_database_archived(
    pool: &SqlitePool,
    database_id: &str,
    archived: bool,
) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE databases SET archived = ? WHERE database_id = ?")
        .bind(archived)
        .bind(database_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
