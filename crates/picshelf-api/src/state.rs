//! Application state shared by all handlers.

use crate::services::upload::ProfilePicUploadService;
use picshelf_core::Config;
use picshelf_db::{UserDirectory, UserRepository};
use picshelf_services::ReconcileService;
use picshelf_storage::{NameAllocator, Storage};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub user_repository: UserRepository,
    pub uploads: Arc<ProfilePicUploadService>,
    /// Present when periodic reconciliation is enabled.
    pub reconciler: Option<Arc<ReconcileService>>,
}

impl AppState {
    /// Wire repositories and services on top of an already migrated pool and a storage root.
    pub fn new(
        config: Config,
        pool: SqlitePool,
        storage: Arc<dyn Storage>,
        allocator: NameAllocator,
    ) -> Self {
        let user_repository = UserRepository::new(pool.clone());

        let uploads = Arc::new(ProfilePicUploadService::new(
            storage.clone(),
            allocator,
            config.upload_max_bytes,
        ));

        let reconciler = config.reconcile_enabled.then(|| {
            let directory: Arc<dyn UserDirectory> = Arc::new(user_repository.clone());
            Arc::new(ReconcileService::new(
                storage,
                directory,
                config.reconcile_page_size,
                config.reconcile_interval(),
            ))
        });

        Self {
            config: Arc::new(config),
            pool,
            user_repository,
            uploads,
            reconciler,
        }
    }
}
