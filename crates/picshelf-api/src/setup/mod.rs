//! Application setup and initialization
//!
//! Everything `main` needs to go from a `Config` to a running server, split so tests can
//! build the same router over their own state.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use picshelf_core::Config;
use std::sync::Arc;

/// Initialize the entire application. Expects tracing to be set up already.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;
    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;

    let storage = storage::setup_storage(&config).await?;

    let state = services::initialize_services(config, pool, storage);

    let router = routes::setup_routes(&state.config, state.clone())?;

    Ok((state, router))
}
