//! Application setup and initialization
//!
//! Startup wiring kept out of main.rs so integration tests can build the same router.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use storely_core::Config;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.environment())?;

    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;

    let objects = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, pool, objects);

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
