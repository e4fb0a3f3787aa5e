//! Pipeline CRUD operations.

use sqlx::SqlitePool;

use crate::{models::PipelineRow, DbError};

const SELECT_PIPELINE: &str = r#"
    SELECT database_id, pipeline_id, description, asset_type, output_type, execution_type,
           wait_for_callback, task_timeout_seconds, task_heartbeat_timeout_seconds,
           enabled, archived, created_at
    FROM pipelines
"#;

/// Insert a fully-populated pipeline row.
pub async fn insert_pipeline(
    pool: &SqlitePool,
    pipeline: &PipelineRow,
) -> Result<PipelineRow, DbError> {
    sqlx::query(
        r#"
        INSERT INTO pipelines
            (database_id, pipeline_id, description, asset_type, output_type, execution_type,
             wait_for_callback, task_timeout_seconds, task_heartbeat_timeout_seconds,
             enabled, archived, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(pipeline.database_id.as_str())
    .bind(pipeline.pipeline_id.as_str())
    .bind(pipeline.description.as_str())
    .bind(pipeline.asset_type.as_str())
    .bind(pipeline.output_type.as_str())
    .bind(pipeline.execution_type)
    .bind(pipeline.wait_for_callback)
    .bind(pipeline.task_timeout_seconds)
    .bind(pipeline.task_heartbeat_timeout_seconds)
    .bind(pipeline.enabled)
    .bind(pipeline.archived)
    .bind(pipeline.created_at)
    .execute(pool)
    .await?;

    find_pipeline(pool, &pipeline.database_id, &pipeline.pipeline_id)
        .await?
        .ok_or(DbError::NotFound)
}

/// Fetch a pipeline by its composite key.
pub async fn find_pipeline(
    pool: &SqlitePool,
    database_id: &str,
    pipeline_id: &str,
) -> Result<Option<PipelineRow>, DbError> {
    let sql = format!("{SELECT_PIPELINE} WHERE database_id = ? AND pipeline_id = ?");
    let row = sqlx::query_as::<_, PipelineRow>(&sql)
        .bind(database_id)
        .bind(pipeline_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Pipelines stored under exactly one database ID, ordered by ID.
pub async fn list_pipelines(
    pool: &SqlitePool,
    database_id: &str,
    include_archived: bool,
) -> Result<Vec<PipelineRow>, DbError> {
    let sql = format!(
        "{SELECT_PIPELINE} WHERE database_id = ? AND (archived = 0 OR ?) ORDER BY pipeline_id"
    );
    let rows = sqlx::query_as::<_, PipelineRow>(&sql)
        .bind(database_id)
        .bind(include_archived)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Enable or disable a pipeline. Returns `DbError::NotFound` if no row matched.
pub async fn set_pipeline_enabled(
    pool: &SqlitePool,
    database_id: &str,
    pipeline_id: &str,
    enabled: bool,
) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE pipelines SET enabled = ? WHERE database_id = ? AND pipeline_id = ?")
            .bind(enabled)
            .bind(database_id)
            .bind(pipeline_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
