//! Strata Server
//!
//! Registry of versioned pipeline definitions.
//!
//! Architecture:
//! - Configuration: environment variables, see [`config::Config`]
//! - Repositories: PostgreSQL or in-memory persistence
//! - Collaborators: filesystems and workflow validation
//! - Services: ownership, guards and pagination
//! - API: axum router

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod marker;
pub mod repository;
pub mod service;

use crate::collaborators::{LocalFilesystems, YamlWorkflowValidator};
use crate::config::{Config, StoreBackend};
use crate::marker::MarkerCodec;
use crate::repository::{
    DefinitionStore, InMemoryDefinitionStore, InMemoryScheduleLookup, PgDefinitionStore,
    PgScheduleLookup, ScheduleLookup,
};
use crate::service::{PermissionGate, PipelineService, SourceResolver};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strata_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Strata Server...");

    let config = Config::from_env().context("Failed to load configuration")?;

    let (store, schedules) = open_store(&config).await?;

    let filesystems = Arc::new(LocalFilesystems::new(&config.fs_root));
    tracing::info!("Serving filesystems from {}", config.fs_root);

    let markers = match &config.marker_secret {
        Some(secret) => MarkerCodec::new(secret),
        None => {
            tracing::warn!(
                "STRATA_MARKER_SECRET not set, pagination markers will not survive a restart"
            );
            MarkerCodec::new(uuid::Uuid::new_v4().as_bytes())
        }
    };

    let pipelines = PipelineService::new(
        store,
        schedules,
        SourceResolver::new(filesystems.clone(), filesystems.clone()),
        Arc::new(YamlWorkflowValidator::new(filesystems)),
        markers,
        config.limits,
    );

    // Build router with all API endpoints
    let app = api::create_router(api::AppState {
        pipelines: Arc::new(pipelines),
        permissions: PermissionGate::new(config.root_users.clone()),
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

async fn open_store(
    config: &Config,
) -> Result<(Arc<dyn DefinitionStore>, Arc<dyn ScheduleLookup>)> {
    match config.store {
        StoreBackend::Postgres => {
            tracing::info!("Connecting to database...");

            let pool = db::create_pool(&config.database_url)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Database connection pool created");

            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            Ok((
                Arc::new(PgDefinitionStore::new(pool.clone())),
                Arc::new(PgScheduleLookup::new(pool)),
            ))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, pipelines are lost on shutdown");
            Ok((
                Arc::new(InMemoryDefinitionStore::new()),
                Arc::new(InMemoryScheduleLookup::new()),
            ))
        }
    }
}
