//! Workflow execution repository functions.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    models::{ExecutionStatus, WorkflowExecutionRow},
    DbError,
};

const SELECT_EXECUTION: &str = r#"
    SELECT workflow_database_id, workflow_id, execution_id, database_id, asset_id,
           status, started_at, stopped_at
    FROM workflow_executions
"#;

/// Create a new workflow execution record in `RUNNING` status.
pub async fn create_execution(
    pool: &SqlitePool,
    workflow_database_id: &str,
    workflow_id: &str,
    execution_id: &str,
    database_id: &str,
    asset_id: &str,
) -> Result<WorkflowExecutionRow, DbError> {
    let row = sqlx::query_as::<_, WorkflowExecutionRow>(
        r#"
        INSERT INTO workflow_executions
            (workflow_database_id, workflow_id, execution_id, database_id, asset_id,
             status, started_at, stopped_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, NULL)
        RETURNING workflow_database_id, workflow_id, execution_id, database_id, asset_id,
                  status, started_at, stopped_at
        "#,
    )
    .bind(workflow_database_id)
    .bind(workflow_id)
    .bind(execution_id)
    .bind(database_id)
    .bind(asset_id)
    .bind(ExecutionStatus::Running)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch one execution by its full key.
pub async fn get_execution(
    pool: &SqlitePool,
    workflow_database_id: &str,
    workflow_id: &str,
    execution_id: &str,
) -> Result<WorkflowExecutionRow, DbError> {
    let sql = format!(
        "{SELECT_EXECUTION} WHERE workflow_database_id = ? AND workflow_id = ? AND execution_id = ?"
    );
    sqlx::query_as::<_, WorkflowExecutionRow>(&sql)
        .bind(workflow_database_id)
        .bind(workflow_id)
        .bind(execution_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Every execution of `workflow_id` against one asset, newest first.
pub async fn list_executions_for_asset(
    pool: &SqlitePool,
    database_id: &str,
    asset_id: &str,
    workflow_id: &str,
) -> Result<Vec<WorkflowExecutionRow>, DbError> {
    let sql = format!(
        r#"{SELECT_EXECUTION}
        WHERE database_id = ? AND asset_id = ? AND workflow_id = ?
        ORDER BY started_at DESC, execution_id DESC"#
    );
    let rows = sqlx::query_as::<_, WorkflowExecutionRow>(&sql)
        .bind(database_id)
        .bind(asset_id)
        .bind(workflow_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Number of executions of `workflow_id` on the asset that are still running.
pub async fn count_running_for_asset(
    pool: &SqlitePool,
    database_id: &str,
    asset_id: &str,
    workflow_id: &str,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM workflow_executions
        WHERE database_id = ? AND asset_id = ? AND workflow_id = ? AND status = ?
        "#,
    )
    .bind(database_id)
    .bind(asset_id)
    .bind(workflow_id)
    .bind(ExecutionStatus::Running)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Move a `RUNNING` execution to `status` and stamp `stopped_at`.
///
/// The status check is part of the `UPDATE`, so of two concurrent updates
/// only one applies. `DbError::NotFound` means the execution is missing or
/// no longer running.
pub async fn finish_running_execution(
    pool: &SqlitePool,
    workflow_database_id: &str,
    workflow_id: &str,
    execution_id: &str,
    status: ExecutionStatus,
    stopped_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE workflow_executions
        SET status = ?, stopped_at = ?
        WHERE workflow_database_id = ? AND workflow_id = ? AND execution_id = ?
          AND status = ?
        "#,
    )
    .bind(status)
    .bind(stopped_at)
    .bind(workflow_database_id)
    .bind(workflow_id)
    .bind(execution_id)
    .bind(ExecutionStatus::Running)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
