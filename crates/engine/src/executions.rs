//! Workflow executions against assets.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use db::models::{ExecutionStatus, WorkflowExecutionRow};
use db::repository::{assets as asset_repo, executions as exec_repo};
use db::DbPool;

use crate::catalog::Catalog;
use crate::models::{ExecutionKey, StartExecution, WatchTarget};
use crate::poller::ExecutionStatusSource;
use crate::EngineError;

/// Starts executions, records their outcome, and lists them.
#[derive(Debug, Clone)]
pub struct ExecutionService {
    pool: DbPool,
    catalog: Catalog,
}

impl ExecutionService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            catalog: Catalog::new(pool.clone()),
            pool,
        }
    }

    /// Start `workflow_id` on an asset.
    ///
    /// # Errors
    /// - [`EngineError::NotFound`] if the asset (or workflow) is missing or
    ///   archived.
    /// - [`EngineError::PipelineDisabled`] if any step is disabled.
    /// - [`EngineError::ExecutionAlreadyRunning`] if the workflow is still
    ///   running on this asset.
    #[instrument(skip(self, request), fields(
        database_id = %request.database_id,
        asset_id = %request.asset_id,
        workflow_id = %request.workflow_id,
    ))]
    pub async fn start_execution(
        &self,
        request: StartExecution,
    ) -> Result<WorkflowExecutionRow, EngineError> {
        let asset = asset_repo::find_asset(&self.pool, &request.database_id, &request.asset_id)
            .await?
            .filter(|a| !a.archived)
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "asset '{}/{}'",
                    request.database_id, request.asset_id
                ))
            })?;

        let lookup_db = request
            .workflow_database_id
            .as_deref()
            .unwrap_or(&asset.database_id);
        let workflow = self.catalog.get_workflow(lookup_db, &request.workflow_id).await?;

        for step in &workflow.pipelines.0 {
            let enabled = self
                .catalog
                .find_pipeline(&step.database_id, &step.pipeline_id)
                .await?
                .is_some_and(|p| p.enabled && !p.archived);
            if !enabled {
                return Err(EngineError::PipelineDisabled(format!(
                    "{}/{}",
                    step.database_id, step.pipeline_id
                )));
            }
        }

        let running = exec_repo::count_running_for_asset(
            &self.pool,
            &asset.database_id,
            &asset.asset_id,
            &workflow.workflow_id,
        )
        .await?;
        if running > 0 {
            warn!("workflow {} already running on asset", workflow.workflow_id);
            return Err(EngineError::ExecutionAlreadyRunning);
        }

        // The count above is a fast path; the partial unique index on running
        // executions is what holds under concurrent starts.
        let execution_id = Uuid::new_v4().to_string();
        let row = match exec_repo::create_execution(
            &self.pool,
            &workflow.database_id,
            &workflow.workflow_id,
            &execution_id,
            &asset.database_id,
            &asset.asset_id,
        )
        .await
        {
            Ok(row) => row,
            Err(e) if e.is_unique_violation() => {
                warn!("workflow {} already running on asset", workflow.workflow_id);
                return Err(EngineError::ExecutionAlreadyRunning);
            }
            Err(e) => return Err(e.into()),
        };

        info!("execution {execution_id} started");
        Ok(row)
    }

    /// Record the outcome of a running execution.
    ///
    /// Only `RUNNING → terminal` is allowed; `stoppedAt` is stamped with the
    /// current time.
    #[instrument(skip(self), fields(execution_id = %key.execution_id))]
    pub async fn update_execution_status(
        &self,
        key: &ExecutionKey,
        status: ExecutionStatus,
    ) -> Result<WorkflowExecutionRow, EngineError> {
        if !status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                from: self.get_execution(key).await?.status,
                to: status,
            });
        }

        let applied = exec_repo::finish_running_execution(
            &self.pool,
            &key.workflow_database_id,
            &key.workflow_id,
            &key.execution_id,
            status,
            Some(Utc::now()),
        )
        .await;

        match applied {
            Ok(()) => {
                info!("execution {} finished with {status}", key.execution_id);
                self.get_execution(key).await
            }
            // Missing, or already moved out of RUNNING by another update.
            Err(db::DbError::NotFound) => Err(EngineError::InvalidTransition {
                from: self.get_execution(key).await?.status,
                to: status,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_execution(
        &self,
        key: &ExecutionKey,
    ) -> Result<WorkflowExecutionRow, EngineError> {
        exec_repo::get_execution(
            &self.pool,
            &key.workflow_database_id,
            &key.workflow_id,
            &key.execution_id,
        )
        .await
        .map_err(|e| {
            EngineError::not_found_or(
                e,
                format!(
                    "execution '{}/{}/{}'",
                    key.workflow_database_id, key.workflow_id, key.execution_id
                ),
            )
        })
    }

    /// Executions of `workflow_id` on an asset, newest first.
    pub async fn list_executions(
        &self,
        database_id: &str,
        asset_id: &str,
        workflow_id: &str,
    ) -> Result<Vec<WorkflowExecutionRow>, EngineError> {
        if asset_repo::find_asset(&self.pool, database_id, asset_id)
            .await?
            .is_none()
        {
            return Err(EngineError::NotFound(format!("asset '{database_id}/{asset_id}'")));
        }
        let rows =
            exec_repo::list_executions_for_asset(&self.pool, database_id, asset_id, workflow_id)
                .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ExecutionStatusSource for ExecutionService {
    async fn fetch(&self, target: &WatchTarget) -> Result<Vec<WorkflowExecutionRow>, EngineError> {
        let workflow_ids = match &target.workflow_id {
            Some(id) => vec![id.clone()],
            None => self
                .catalog
                .list_workflows(&target.database_id, false)
                .await?
                .into_iter()
                .map(|w| w.workflow_id)
                .collect(),
        };

        let mut rows = Vec::new();
        for workflow_id in dedup(workflow_ids) {
            rows.extend(
                self.list_executions(&target.database_id, &target.asset_id, &workflow_id)
                    .await?,
            );
        }
        Ok(rows)
    }
}

/// A local and a GLOBAL workflow can share an id; list each id once.
fn dedup(mut ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
    ids
}
