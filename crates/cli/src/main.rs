//! `asset-registry` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`  : start the API server.
//! - `migrate`: run pending database migrations.
//! - `watch`  : poll an asset's workflow executions until they all finish.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::ServeConfig;
use engine::{ExecutionPoller, ExecutionService, PollConfig, WatchTarget};

const DEFAULT_DATABASE_URL: &str = "sqlite://asset-registry.db";

#[derive(Parser)]
#[command(
    name = "asset-registry",
    about = "Asset link graph and workflow catalog service",
    version
)]
struct Cli {
    /// SQLite connection string.
    #[arg(long, global = true, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, env = "ASSET_REGISTRY_BIND", default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, env = "ASSET_REGISTRY_MAX_CONNECTIONS", default_value_t = 10)]
        max_connections: u32,
    },
    /// Run pending database migrations.
    Migrate,
    /// Print execution snapshots for an asset until none is running.
    Watch {
        #[arg(long)]
        database_id: String,
        #[arg(long)]
        asset_id: String,
        /// Restrict to one workflow; all visible workflows otherwise.
        #[arg(long)]
        workflow_id: Option<String>,
        #[arg(long, env = "ASSET_REGISTRY_POLL_SECS", default_value_t = 10)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            max_connections,
        } => {
            let config = ServeConfig {
                bind,
                max_connections,
                ..ServeConfig::default()
            };
            let pool = db::pool::create_pool(&cli.database_url, config.max_connections)
                .await
                .context("failed to connect to database")?;
            db::pool::run_migrations(&pool)
                .await
                .context("migration failed")?;
            info!("Starting API server on {}", config.bind);
            api::serve(&config, pool).await.context("server error")?;
        }
        Command::Migrate => {
            info!("Running migrations against {}", cli.database_url);
            let pool = db::pool::create_pool(&cli.database_url, 2)
                .await
                .context("failed to connect to database")?;
            db::pool::run_migrations(&pool)
                .await
                .context("migration failed")?;
            info!("Migrations applied successfully");
        }
        Command::Watch {
            database_id,
            asset_id,
            workflow_id,
            interval_secs,
        } => {
            let pool = db::pool::create_pool(&cli.database_url, 2)
                .await
                .context("failed to connect to database")?;
            let poller = ExecutionPoller::new(
                Arc::new(ExecutionService::new(pool)),
                PollConfig {
                    interval: Duration::from_secs(interval_secs.max(1)),
                },
            );
            let target = WatchTarget {
                database_id,
                asset_id,
                workflow_id,
            };

            let last = poller
                .watch(&target, |snapshot| {
                    match serde_json::to_string(snapshot) {
                        Ok(line) => println!("{line}"),
                        Err(e) => eprintln!("cannot render snapshot: {e}"),
                    }
                })
                .await
                .context("watch failed")?;
            info!("{} executions finished", last.len());
        }
    }

    Ok(())
}
