//! Workflow CRUD operations.

use sqlx::SqlitePool;

use crate::{models::WorkflowRow, DbError};

const SELECT_WORKFLOW: &str = r#"
    SELECT database_id, workflow_id, description, pipelines, archived, created_at
    FROM workflows
"#;

/// Insert a new workflow definition.
///
/// The pipeline references are expected to have been checked by the
/// `engine` crate already.
pub async fn create_workflow(
    pool: &SqlitePool,
    workflow: &WorkflowRow,
) -> Result<WorkflowRow, DbError> {
    let row = sqlx::query_as::<_, WorkflowRow>(
        r#"
        INSERT INTO workflows
            (database_id, workflow_id, description, pipelines, archived, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING database_id, workflow_id, description, pipelines, archived, created_at
        "#,
    )
    .bind(workflow.database_id.as_str())
    .bind(workflow.workflow_id.as_str())
    .bind(workflow.description.as_str())
    .bind(&workflow.pipelines)
    .bind(workflow.archived)
    .bind(workflow.created_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a single workflow by its composite key, archived or not.
pub async fn find_workflow(
    pool: &SqlitePool,
    database_id: &str,
    workflow_id: &str,
) -> Result<Option<WorkflowRow>, DbError> {
    let sql = format!("{SELECT_WORKFLOW} WHERE database_id = ? AND workflow_id = ?");
    let row = sqlx::query_as::<_, WorkflowRow>(&sql)
        .bind(database_id)
        .bind(workflow_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Workflows stored under exactly one database ID, ordered by ID.
pub async fn list_workflows(
    pool: &SqlitePool,
    database_id: &str,
    include_archived: bool,
) -> Result<Vec<WorkflowRow>, DbError> {
    let sql = format!(
        "{SELECT_WORKFLOW} WHERE database_id = ? AND (archived = 0 OR ?) ORDER BY workflow_id"
    );
    let rows = sqlx::query_as::<_, WorkflowRow>(&sql)
        .bind(database_id)
        .bind(include_archived)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Soft-delete a workflow.
///
/// Returns `DbError::NotFound` if no row was updated.
pub async fn set_workflow_archived(
    pool: &SqlitePool,
    database_id: &str,
    workflow_id: &str,
    archived: bool,
) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE workflows SET archived = ? WHERE database_id = ? AND workflow_id = ?")
            .bind(archived)
            .bind(database_id)
            .bind(workflow_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
