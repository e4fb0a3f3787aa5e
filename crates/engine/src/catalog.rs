//! Databases, assets, pipelines, and workflows.
//!
//! Pipelines and workflows stored under the reserved `GLOBAL` database are
//! visible from every database: listings merge the database's own entries
//! with GLOBAL's, and workflow lookups fall back to GLOBAL.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::Utc;
use sqlx::types::Json;
use tracing::{info, instrument, warn};

use db::models::{AssetRow, DatabaseRow, PipelineRow, WorkflowRow};
use db::repository::{assets, databases, pipelines, workflows};
use db::{DbError, DbPool, GLOBAL_DATABASE_ID};

use crate::models::{NewAsset, NewPipeline, NewWorkflow};
use crate::validation::{
    validate_asset_id, validate_database_id, validate_file_extension, validate_id,
    validate_string_256,
};
use crate::EngineError;

/// Registry of databases, assets, pipelines, and workflows.
#[derive(Debug, Clone)]
pub struct Catalog {
    pool: DbPool,
}

impl Catalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    // -----------------------------------------------------------------------
    // Databases
    // -----------------------------------------------------------------------

    #[instrument(skip(self, description))]
    pub async fn create_database(
        &self,
        database_id: &str,
        description: &str,
    ) -> Result<DatabaseRow, EngineError> {
        if database_id == GLOBAL_DATABASE_ID {
            return Err(EngineError::ReservedDatabase(database_id.to_owned()));
        }
        validate_id("databaseId", database_id)?;
        validate_string_256("description", description)?;

        let row = databases::create_database(&self.pool, database_id, description)
            .await
            .map_err(|e| conflict_or(e, format!("database '{database_id}'")))?;
        info!("database {database_id} created");
        Ok(row)
    }

    pub async fn get_database(&self, database_id: &str) -> Result<DatabaseRow, EngineError> {
        databases::get_database(&self.pool, database_id)
            .await
            .map_err(|e| EngineError::not_found_or(e, format!("database '{database_id}'")))
    }

    pub async fn list_databases(
        &self,
        include_archived: bool,
    ) -> Result<Vec<DatabaseRow>, EngineError> {
        Ok(databases::list_databases(&self.pool, include_archived).await?)
    }

    /// Soft-delete a database. `GLOBAL` cannot be archived.
    #[instrument(skip(self))]
    pub async fn archive_database(&self, database_id: &str) -> Result<(), EngineError> {
        if database_id == GLOBAL_DATABASE_ID {
            return Err(EngineError::ReservedDatabase(database_id.to_owned()));
        }
        databases::set_database_archived(&self.pool, database_id, true)
            .await
            .map_err(|e| EngineError::not_found_or(e, format!("database '{database_id}'")))?;
        info!("database {database_id} archived");
        Ok(())
    }

    /// The database, provided it exists and is not archived.
    async fn active_database(&self, database_id: &str) -> Result<DatabaseRow, EngineError> {
        let db = self.get_database(database_id).await?;
        if db.archived {
            return Err(EngineError::NotFound(format!("database '{database_id}'")));
        }
        Ok(db)
    }

    // -----------------------------------------------------------------------
    // Assets
    // -----------------------------------------------------------------------

    #[instrument(skip(self, asset), fields(asset_id = %asset.asset_id))]
    pub async fn create_asset(
        &self,
        database_id: &str,
        asset: NewAsset,
    ) -> Result<AssetRow, EngineError> {
        validate_id("databaseId", database_id)?;
        validate_asset_id("assetId", &asset.asset_id)?;
        validate_string_256("assetName", &asset.asset_name)?;
        validate_string_256("description", &asset.description)?;
        if asset.asset_name.trim().is_empty() {
            return Err(EngineError::invalid("assetName", "must not be empty"));
        }
        self.active_database(database_id).await?;

        let row = AssetRow {
            database_id: database_id.to_owned(),
            asset_id: asset.asset_id,
            asset_name: asset.asset_name,
            description: asset.description,
            asset_type: asset.asset_type,
            is_distributable: asset.is_distributable,
            current_version_id: asset.current_version_id,
            preview_location: asset.preview_location,
            gltf_location: asset.gltf_location,
            laz_location: asset.laz_location,
            archived: false,
            created_at: Utc::now(),
        };

        let stored = assets::insert_asset(&self.pool, &row).await.map_err(|e| {
            conflict_or(e, format!("asset '{}/{}'", row.database_id, row.asset_id))
        })?;
        info!("asset {}/{} created", stored.database_id, stored.asset_id);
        Ok(stored)
    }

    pub async fn get_asset(
        &self,
        database_id: &str,
        asset_id: &str,
    ) -> Result<AssetRow, EngineError> {
        assets::get_asset(&self.pool, database_id, asset_id)
            .await
            .map_err(|e| EngineError::not_found_or(e, asset_label(database_id, asset_id)))
    }

    pub async fn list_assets(
        &self,
        database_id: &str,
        include_archived: bool,
    ) -> Result<Vec<AssetRow>, EngineError> {
        self.get_database(database_id).await?;
        Ok(assets::list_assets(&self.pool, database_id, include_archived).await?)
    }

    /// Soft delete. Links stay in place and are hidden from listings.
    #[instrument(skip(self))]
    pub async fn archive_asset(
        &self,
        database_id: &str,
        asset_id: &str,
    ) -> Result<(), EngineError> {
        assets::set_asset_archived(&self.pool, database_id, asset_id, true)
            .await
            .map_err(|e| EngineError::not_found_or(e, asset_label(database_id, asset_id)))?;
        info!("asset {database_id}/{asset_id} archived");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn restore_asset(
        &self,
        database_id: &str,
        asset_id: &str,
    ) -> Result<AssetRow, EngineError> {
        assets::set_asset_archived(&self.pool, database_id, asset_id, false)
            .await
            .map_err(|e| EngineError::not_found_or(e, asset_label(database_id, asset_id)))?;
        self.get_asset(database_id, asset_id).await
    }

    /// Permanently delete an asset along with every link touching it and
    /// their metadata. Returns the number of links removed.
    #[instrument(skip(self))]
    pub async fn delete_asset(
        &self,
        database_id: &str,
        asset_id: &str,
    ) -> Result<u64, EngineError> {
        let removed = assets::delete_asset_cascade(&self.pool, database_id, asset_id)
            .await
            .map_err(|e| EngineError::not_found_or(e, asset_label(database_id, asset_id)))?;
        warn!("asset {database_id}/{asset_id} permanently deleted with {removed} links");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Pipelines
    // -----------------------------------------------------------------------

    #[instrument(skip(self, pipeline), fields(pipeline_id = %pipeline.pipeline_id))]
    pub async fn create_pipeline(
        &self,
        database_id: &str,
        pipeline: NewPipeline,
    ) -> Result<PipelineRow, EngineError> {
        validate_database_id("databaseId", database_id)?;
        validate_id("pipelineId", &pipeline.pipeline_id)?;
        validate_string_256("description", &pipeline.description)?;
        validate_file_extension("assetType", &pipeline.asset_type)?;
        validate_file_extension("outputType", &pipeline.output_type)?;
        check_timeouts(&pipeline)?;
        self.active_database(database_id).await?;

        let row = PipelineRow {
            database_id: database_id.to_owned(),
            pipeline_id: pipeline.pipeline_id,
            description: pipeline.description,
            asset_type: pipeline.asset_type,
            output_type: pipeline.output_type,
            execution_type: pipeline.execution_type,
            wait_for_callback: pipeline.wait_for_callback,
            task_timeout_seconds: pipeline.task_timeout_seconds,
            task_heartbeat_timeout_seconds: pipeline.task_heartbeat_timeout_seconds,
            enabled: false,
            archived: false,
            created_at: Utc::now(),
        };

        let stored = pipelines::insert_pipeline(&self.pool, &row).await.map_err(|e| {
            conflict_or(e, format!("pipeline '{}/{}'", row.database_id, row.pipeline_id))
        })?;
        info!("pipeline {}/{} created", stored.database_id, stored.pipeline_id);
        Ok(stored)
    }

    pub async fn set_pipeline_enabled(
        &self,
        database_id: &str,
        pipeline_id: &str,
        enabled: bool,
    ) -> Result<PipelineRow, EngineError> {
        let label = format!("pipeline '{database_id}/{pipeline_id}'");
        pipelines::set_pipeline_enabled(&self.pool, database_id, pipeline_id, enabled)
            .await
            .map_err(|e| EngineError::not_found_or(e, label.clone()))?;
        info!("pipeline {database_id}/{pipeline_id} enabled={enabled}");
        pipelines::find_pipeline(&self.pool, database_id, pipeline_id)
            .await?
            .ok_or(EngineError::NotFound(label))
    }

    /// Pipelines of `database_id` followed by GLOBAL's.
    pub async fn list_pipelines(
        &self,
        database_id: &str,
        include_archived: bool,
    ) -> Result<Vec<PipelineRow>, EngineError> {
        self.get_database(database_id).await?;
        let local = pipelines::list_pipelines(&self.pool, database_id, include_archived).await?;
        if database_id == GLOBAL_DATABASE_ID {
            return Ok(local);
        }
        let global =
            pipelines::list_pipelines(&self.pool, GLOBAL_DATABASE_ID, include_archived).await?;
        Ok(merge_with_global(local, global, |p| {
            (p.database_id.clone(), p.pipeline_id.clone())
        }))
    }

    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    /// Register a workflow whose steps reference existing pipelines.
    ///
    /// Steps may point at the workflow's own database or GLOBAL; a GLOBAL
    /// workflow may only reference GLOBAL pipelines.
    #[instrument(skip(self, workflow), fields(workflow_id = %workflow.workflow_id))]
    pub async fn create_workflow(
        &self,
        database_id: &str,
        workflow: NewWorkflow,
    ) -> Result<WorkflowRow, EngineError> {
        validate_database_id("databaseId", database_id)?;
        validate_id("workflowId", &workflow.workflow_id)?;
        validate_string_256("description", &workflow.description)?;
        if workflow.pipelines.is_empty() {
            return Err(EngineError::invalid("pipelines", "must contain at least one pipeline"));
        }
        self.active_database(database_id).await?;

        for step in &workflow.pipelines {
            let allowed = step.database_id == GLOBAL_DATABASE_ID
                || (database_id != GLOBAL_DATABASE_ID && step.database_id == database_id);
            if !allowed {
                return Err(EngineError::invalid(
                    "pipelines",
                    format!(
                        "pipeline '{}/{}' must belong to '{database_id}' or GLOBAL",
                        step.database_id, step.pipeline_id
                    ),
                ));
            }
            let found = pipelines::find_pipeline(&self.pool, &step.database_id, &step.pipeline_id)
                .await?
                .filter(|p| !p.archived);
            if found.is_none() {
                return Err(EngineError::NotFound(format!(
                    "pipeline '{}/{}'",
                    step.database_id, step.pipeline_id
                )));
            }
        }

        let row = WorkflowRow {
            database_id: database_id.to_owned(),
            workflow_id: workflow.workflow_id,
            description: workflow.description,
            pipelines: Json(workflow.pipelines),
            archived: false,
            created_at: Utc::now(),
        };

        let stored = workflows::create_workflow(&self.pool, &row).await.map_err(|e| {
            conflict_or(e, format!("workflow '{}/{}'", row.database_id, row.workflow_id))
        })?;
        info!(
            "workflow {}/{} created with {} pipelines",
            stored.database_id,
            stored.workflow_id,
            stored.pipelines.0.len()
        );
        Ok(stored)
    }

    /// Active workflow `workflow_id` as seen from `database_id`: the
    /// database's own entry if present, otherwise GLOBAL's.
    pub async fn get_workflow(
        &self,
        database_id: &str,
        workflow_id: &str,
    ) -> Result<WorkflowRow, EngineError> {
        let local = workflows::find_workflow(&self.pool, database_id, workflow_id)
            .await?
            .filter(|w| !w.archived);
        if let Some(workflow) = local {
            return Ok(workflow);
        }
        if database_id != GLOBAL_DATABASE_ID {
            let global = workflows::find_workflow(&self.pool, GLOBAL_DATABASE_ID, workflow_id)
                .await?
                .filter(|w| !w.archived);
            if let Some(workflow) = global {
                return Ok(workflow);
            }
        }
        Err(EngineError::NotFound(format!("workflow '{workflow_id}'")))
    }

    /// Workflows of `database_id` followed by GLOBAL's, without duplicates.
    pub async fn list_workflows(
        &self,
        database_id: &str,
        include_archived: bool,
    ) -> Result<Vec<WorkflowRow>, EngineError> {
        self.get_database(database_id).await?;
        let local = workflows::list_workflows(&self.pool, database_id, include_archived).await?;
        if database_id == GLOBAL_DATABASE_ID {
            return Ok(local);
        }
        let global =
            workflows::list_workflows(&self.pool, GLOBAL_DATABASE_ID, include_archived).await?;
        Ok(merge_with_global(local, global, |w| {
            (w.database_id.clone(), w.workflow_id.clone())
        }))
    }

    #[instrument(skip(self))]
    pub async fn archive_workflow(
        &self,
        database_id: &str,
        workflow_id: &str,
    ) -> Result<(), EngineError> {
        workflows::set_workflow_archived(&self.pool, database_id, workflow_id, true)
            .await
            .map_err(|e| {
                EngineError::not_found_or(e, format!("workflow '{database_id}/{workflow_id}'"))
            })?;
        info!("workflow {database_id}/{workflow_id} archived");
        Ok(())
    }

    /// Fetch a pipeline by its exact key.
    pub async fn find_pipeline(
        &self,
        database_id: &str,
        pipeline_id: &str,
    ) -> Result<Option<PipelineRow>, EngineError> {
        Ok(pipelines::find_pipeline(&self.pool, database_id, pipeline_id).await?)
    }
}

/// Concatenate `local` and `global`, keeping the first occurrence of each key.
pub fn merge_with_global<T, K, F>(local: Vec<T>, global: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    local
        .into_iter()
        .chain(global)
        .filter(|item| seen.insert(key(item)))
        .collect()
}

fn check_timeouts(pipeline: &NewPipeline) -> Result<(), EngineError> {
    if let Some(timeout) = pipeline.task_timeout_seconds {
        if timeout <= 0 {
            return Err(EngineError::invalid("taskTimeoutSeconds", "must be positive"));
        }
    }
    if let Some(heartbeat) = pipeline.task_heartbeat_timeout_seconds {
        if !pipeline.wait_for_callback {
            return Err(EngineError::invalid(
                "taskHeartbeatTimeoutSeconds",
                "requires waitForCallback",
            ));
        }
        if heartbeat <= 0 {
            return Err(EngineError::invalid("taskHeartbeatTimeoutSeconds", "must be positive"));
        }
        if pipeline.task_timeout_seconds.is_some_and(|t| heartbeat >= t) {
            return Err(EngineError::invalid(
                "taskHeartbeatTimeoutSeconds",
                "must be lower than taskTimeoutSeconds",
            ));
        }
    }
    Ok(())
}

fn conflict_or(err: DbError, what: String) -> EngineError {
    if err.is_unique_violation() {
        EngineError::AlreadyExists(what)
    } else {
        EngineError::Database(err)
    }
}

fn asset_label(database_id: &str, asset_id: &str) -> String {
    format!("asset '{database_id}/{asset_id}'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_asset, setup};
    use db::models::{ExecutionType, PipelineRef};

    fn pipeline(id: &str) -> NewPipeline {
        NewPipeline {
            pipeline_id: id.into(),
            description: String::new(),
            asset_type: ".e57".into(),
            output_type: ".laz".into(),
            execution_type: ExecutionType::Lambda,
            wait_for_callback: false,
            task_timeout_seconds: None,
            task_heartbeat_timeout_seconds: None,
        }
    }

    fn workflow(id: &str, steps: &[(&str, &str)]) -> NewWorkflow {
        NewWorkflow {
            workflow_id: id.into(),
            description: String::new(),
            pipelines: steps
                .iter()
                .map(|(db, p)| PipelineRef {
                    database_id: (*db).into(),
                    pipeline_id: (*p).into(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn global_is_reserved() {
        let catalog = Catalog::new(setup().await);
        assert!(matches!(
            catalog.create_database("GLOBAL", "").await,
            Err(EngineError::ReservedDatabase(_))
        ));
        assert!(matches!(
            catalog.archive_database("GLOBAL").await,
            Err(EngineError::ReservedDatabase(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_database_is_a_conflict() {
        let catalog = Catalog::new(setup().await);
        catalog.create_database("plant", "").await.unwrap();
        assert!(matches!(
            catalog.create_database("plant", "").await,
            Err(EngineError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn archived_database_rejects_new_assets() {
        let catalog = Catalog::new(setup().await);
        catalog.create_database("plant", "").await.unwrap();
        catalog.archive_database("plant").await.unwrap();

        let err = catalog
            .create_asset(
                "plant",
                NewAsset {
                    asset_id: "boiler".into(),
                    asset_name: "Boiler".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let visible = catalog.list_databases(false).await.unwrap();
        assert!(visible.iter().all(|d| d.database_id != "plant"));
    }

    #[tokio::test]
    async fn archive_and_restore_asset() {
        let catalog = Catalog::new(setup().await);
        catalog.create_database("plant", "").await.unwrap();
        seed_asset(&catalog.pool, "plant", "boiler").await;

        catalog.archive_asset("plant", "boiler").await.unwrap();
        assert!(catalog.list_assets("plant", false).await.unwrap().is_empty());
        assert_eq!(catalog.list_assets("plant", true).await.unwrap().len(), 1);

        let restored = catalog.restore_asset("plant", "boiler").await.unwrap();
        assert!(!restored.archived);
    }

    #[tokio::test]
    async fn heartbeat_requires_callback() {
        let catalog = Catalog::new(setup().await);
        catalog.create_database("plant", "").await.unwrap();
        let mut p = pipeline("scan-to-laz");
        p.task_heartbeat_timeout_seconds = Some(30);
        assert!(matches!(
            catalog.create_pipeline("plant", p.clone()).await,
            Err(EngineError::InvalidField { field, .. }) if field == "taskHeartbeatTimeoutSeconds"
        ));

        p.wait_for_callback = true;
        p.task_timeout_seconds = Some(600);
        let stored = catalog.create_pipeline("plant", p).await.unwrap();
        assert!(!stored.enabled, "new pipelines start disabled");
    }

    #[tokio::test]
    async fn workflow_listing_merges_global_without_duplicates() {
        let catalog = Catalog::new(setup().await);
        catalog.create_database("plant", "").await.unwrap();
        catalog.create_pipeline("GLOBAL", pipeline("shared-conv")).await.unwrap();
        catalog.create_pipeline("plant", pipeline("local-conv")).await.unwrap();

        catalog
            .create_workflow("GLOBAL", workflow("shared-flow", &[("GLOBAL", "shared-conv")]))
            .await
            .unwrap();
        catalog
            .create_workflow(
                "plant",
                workflow("local-flow", &[("plant", "local-conv"), ("GLOBAL", "shared-conv")]),
            )
            .await
            .unwrap();
        // Same id as the global one, different key.
        catalog
            .create_workflow("plant", workflow("shared-flow", &[("plant", "local-conv")]))
            .await
            .unwrap();

        let listed = catalog.list_workflows("plant", false).await.unwrap();
        let keys: Vec<(String, String)> = listed
            .iter()
            .map(|w| (w.database_id.clone(), w.workflow_id.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("plant".to_string(), "local-flow".to_string()),
                ("plant".to_string(), "shared-flow".to_string()),
                ("GLOBAL".to_string(), "shared-flow".to_string()),
            ]
        );

        let global_only = catalog.list_workflows("GLOBAL", false).await.unwrap();
        assert_eq!(global_only.len(), 1);

        let pipelines = catalog.list_pipelines("plant", false).await.unwrap();
        assert_eq!(pipelines.len(), 2);
    }

    #[tokio::test]
    async fn global_workflow_cannot_use_database_pipelines() {
        let catalog = Catalog::new(setup().await);
        catalog.create_database("plant", "").await.unwrap();
        catalog.create_pipeline("plant", pipeline("local-conv")).await.unwrap();

        let err = catalog
            .create_workflow("GLOBAL", workflow("bad-flow", &[("plant", "local-conv")]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidField { .. }));
    }

    #[tokio::test]
    async fn workflow_requires_existing_pipelines() {
        let catalog = Catalog::new(setup().await);
        catalog.create_database("plant", "").await.unwrap();
        assert!(matches!(
            catalog
                .create_workflow("plant", workflow("flow", &[("plant", "nope")]))
                .await,
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            catalog.create_workflow("plant", workflow("flow", &[])).await,
            Err(EngineError::InvalidField { .. })
        ));
    }

    #[tokio::test]
    async fn workflow_lookup_falls_back_to_global() {
        let catalog = Catalog::new(setup().await);
        catalog.create_database("plant", "").await.unwrap();
        catalog.create_pipeline("GLOBAL", pipeline("shared-conv")).await.unwrap();
        catalog
            .create_workflow("GLOBAL", workflow("shared-flow", &[("GLOBAL", "shared-conv")]))
            .await
            .unwrap();

        let found = catalog.get_workflow("plant", "shared-flow").await.unwrap();
        assert_eq!(found.database_id, "GLOBAL");

        catalog.archive_workflow("GLOBAL", "shared-flow").await.unwrap();
        assert!(matches!(
            catalog.get_workflow("plant", "shared-flow").await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn merge_keeps_first_occurrence() {
        let merged = merge_with_global(vec![1, 2, 3], vec![3, 4], |n| *n);
        assert_eq!(merged, vec![1, 2, 3, 4]);
    }
}
