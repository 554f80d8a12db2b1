//! Service wiring and background tasks

use crate::state::AppState;
use picshelf_core::Config;
use picshelf_storage::{NameAllocator, Storage};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Build application state with the wall clock for upload names.
pub fn initialize_services(
    config: Config,
    pool: SqlitePool,
    storage: Arc<dyn Storage>,
) -> Arc<AppState> {
    let state = AppState::new(config, pool, storage, NameAllocator::system());

    if state.reconciler.is_none() {
        tracing::warn!("Storage reconciliation disabled, orphaned uploads will accumulate");
    }

    Arc::new(state)
}

/// Spawn the periodic reconciler, if enabled. The handle is aborted on shutdown.
pub fn start_background_tasks(state: &AppState) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    if let Some(reconciler) = &state.reconciler {
        tracing::info!(
            interval_secs = reconciler.interval().as_secs(),
            "Starting storage reconciler"
        );
        handles.push(reconciler.clone().start());
    }

    handles
}
