//! Storage setup

use anyhow::{Context, Result};
use picshelf_core::Config;
use picshelf_storage::{LocalStorage, Storage};
use std::sync::Arc;

/// Open the storage root, creating it if needed.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = LocalStorage::new(&config.storage_root)
        .await
        .context("Failed to initialize local storage")?;

    tracing::info!(
        storage_root = %storage.base_path().display(),
        "Local storage initialized"
    );

    Ok(Arc::new(storage))
}
