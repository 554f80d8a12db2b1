use picshelf_core::AppError;
use picshelf_db::UserDirectory;
use picshelf_storage::{Storage, StorageError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Failed to list storage: {0}")]
    ListFailed(#[source] StorageError),

    #[error("Failed to read users page at offset {offset}: {source}")]
    PageFailed {
        offset: i64,
        #[source]
        source: AppError,
    },

    #[error("A reconciliation pass is already running")]
    AlreadyRunning,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Files found in the storage root.
    pub scanned: usize,
    /// Files kept because a user row references them.
    pub referenced: usize,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Clears the running flag when a pass ends, including on early return.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ReconcileService {
    storage: Arc<dyn Storage>,
    directory: Arc<dyn UserDirectory>,
    page_size: i64,
    interval: Duration,
    running: AtomicBool,
}

impl ReconcileService {
    pub fn new(
        storage: Arc<dyn Storage>,
        directory: Arc<dyn UserDirectory>,
        page_size: i64,
        interval: Duration,
    ) -> Self {
        Self {
            storage,
            directory,
            page_size: page_size.max(1),
            interval,
            running: AtomicBool::new(false),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the periodic reconciliation task. The first pass runs one interval after start.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(
                interval_secs = self.interval.as_secs(),
                page_size = self.page_size,
                "Storage reconciler started"
            );

            loop {
                ticker.tick().await;

                match self.run_once().await {
                    Ok(report) => {
                        tracing::info!(
                            scanned = report.scanned,
                            referenced = report.referenced,
                            deleted = report.deleted.len(),
                            failed = report.failed.len(),
                            "Storage reconciliation completed"
                        );
                    }
                    Err(ReconcileError::AlreadyRunning) => {
                        tracing::warn!("Previous reconciliation still running, skipping tick");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Storage reconciliation aborted");
                    }
                }
            }
        })
    }

    /// Run a single pass: delete every stored file that no user references.
    ///
    /// Nothing is deleted unless the storage listing and every users page were read
    /// successfully.
    #[tracing::instrument(skip(self), fields(reconcile.operation = "run_once"))]
    pub async fn run_once(&self) -> Result<ReconcileReport, ReconcileError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ReconcileError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        let mut candidates: HashSet<String> = self
            .storage
            .list()
            .await
            .map_err(ReconcileError::ListFailed)?
            .into_iter()
            .collect();
        let scanned = candidates.len();

        let mut referenced = 0;
        let mut offset = 0i64;
        loop {
            let page = self
                .directory
                .list(self.page_size, offset)
                .await
                .map_err(|source| ReconcileError::PageFailed { offset, source })?;
            if page.is_empty() {
                break;
            }

            for user in &page {
                if let Some(name) = user.profile_pic_ref() {
                    if candidates.remove(name) {
                        referenced += 1;
                    }
                }
            }
            offset += self.page_size;
        }

        let mut orphans: Vec<String> = candidates.into_iter().collect();
        orphans.sort();

        let mut report = ReconcileReport {
            scanned,
            referenced,
            ..ReconcileReport::default()
        };

        for name in orphans {
            match self.storage.delete(&name).await {
                Ok(()) => {
                    tracing::info!(storage_name = %name, "Deleted unreferenced file");
                    report.deleted.push(name);
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        storage_name = %name,
                        "Failed to delete unreferenced file, continuing"
                    );
                    report.failed.push(name);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use picshelf_core::{User, UserUpdate};
    use picshelf_storage::LocalStorage;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    fn user(id: i64, profile_pic: Option<&str>) -> User {
        User {
            id,
            name: format!("user{}", id),
            email: format!("user{}@example.com", id),
            profile_pic: profile_pic.map(str::to_string),
        }
    }

    /// In-memory directory that can be told to fail at a given offset.
    #[derive(Default)]
    struct FakeDirectory {
        users: Mutex<Vec<User>>,
        fail_at_offset: Option<i64>,
        calls: AtomicUsize,
    }

    impl FakeDirectory {
        fn with_users(users: Vec<User>) -> Self {
            Self {
                users: Mutex::new(users),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl UserDirectory for FakeDirectory {
        async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_at_offset == Some(offset) {
                return Err(AppError::Internal("connection reset".to_string()));
            }
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn update(&self, _id: i64, _update: &UserUpdate) -> Result<bool, AppError> {
            Ok(false)
        }
    }

    /// Blocks the first page read until released, to hold a pass open.
    struct BlockingDirectory {
        entered: Notify,
        release: Notify,
        blocked_once: AtomicBool,
    }

    #[async_trait]
    impl UserDirectory for BlockingDirectory {
        async fn list(&self, _limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
            if offset == 0 && !self.blocked_once.swap(true, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(Vec::new())
        }

        async fn update(&self, _id: i64, _update: &UserUpdate) -> Result<bool, AppError> {
            Ok(false)
        }
    }

    /// Local storage whose deletes fail for one name.
    struct StuckFileStorage {
        inner: LocalStorage,
        stuck: String,
    }

    #[async_trait]
    impl Storage for StuckFileStorage {
        async fn put_stream(
            &self,
            name: &str,
            reader: picshelf_storage::BlobReader,
        ) -> picshelf_storage::StorageResult<u64> {
            self.inner.put_stream(name, reader).await
        }

        async fn list(&self) -> picshelf_storage::StorageResult<Vec<String>> {
            self.inner.list().await
        }

        async fn delete(&self, name: &str) -> picshelf_storage::StorageResult<()> {
            if name == self.stuck {
                return Err(StorageError::DeleteFailed(format!("{} is busy", name)));
            }
            self.inner.delete(name).await
        }
    }

    async fn storage_with(files: &[&str]) -> (TempDir, Arc<LocalStorage>) {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            std::fs::write(dir.path().join(name), b"data").unwrap();
        }
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (dir, Arc::new(storage))
    }

    fn on_disk(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    fn service(storage: Arc<LocalStorage>, directory: Arc<dyn UserDirectory>) -> ReconcileService {
        ReconcileService::new(storage, directory, 10, Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_deletes_only_unreferenced_files() {
        let (dir, storage) = storage_with(&["A.jpg", "B.jpg", "C.jpg"]).await;
        let directory = Arc::new(FakeDirectory::with_users(vec![user(1, Some("B.jpg"))]));

        let report = service(storage, directory).run_once().await.unwrap();

        assert_eq!(on_disk(&dir), vec!["B.jpg".to_string()]);
        assert_eq!(report.scanned, 3);
        assert_eq!(report.referenced, 1);
        assert_eq!(
            report.deleted,
            vec!["A.jpg".to_string(), "C.jpg".to_string()]
        );
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_second_pass_is_a_no_op() {
        let (dir, storage) = storage_with(&["1-a.png", "2-b.png", "3-c.png"]).await;
        let directory = Arc::new(FakeDirectory::with_users(vec![
            user(1, Some("1-a.png")),
            user(2, None),
        ]));
        let service = service(storage, directory);

        service.run_once().await.unwrap();
        let after_first = on_disk(&dir);
        let second = service.run_once().await.unwrap();

        assert_eq!(on_disk(&dir), after_first);
        assert!(second.deleted.is_empty());
        assert_eq!(second.scanned, 1);
    }

    #[tokio::test]
    async fn test_empty_and_null_references_protect_nothing() {
        let (dir, storage) = storage_with(&["x.png"]).await;
        let directory = Arc::new(FakeDirectory::with_users(vec![
            user(1, None),
            user(2, Some("")),
        ]));

        let report = service(storage, directory).run_once().await.unwrap();

        assert!(on_disk(&dir).is_empty());
        assert_eq!(report.deleted, vec!["x.png".to_string()]);
    }

    #[tokio::test]
    async fn test_pagination_reads_every_row() {
        for rows in [0usize, 1, 10, 11] {
            let names: Vec<String> = (0..rows).map(|i| format!("{}-pic.png", i)).collect();
            let mut files: Vec<&str> = names.iter().map(String::as_str).collect();
            files.push("orphan.png");
            let (dir, storage) = storage_with(&files).await;

            let users = names
                .iter()
                .enumerate()
                .map(|(i, name)| user(i as i64 + 1, Some(name)))
                .collect();
            let directory = Arc::new(FakeDirectory::with_users(users));

            let report = service(storage, directory.clone()).run_once().await.unwrap();

            assert_eq!(report.referenced, rows, "rows = {}", rows);
            assert_eq!(report.deleted, vec!["orphan.png".to_string()]);
            assert_eq!(on_disk(&dir).len(), rows);
            // one call per page plus the terminating empty page
            let expected_calls = rows.div_ceil(10) + 1;
            assert_eq!(directory.calls.load(Ordering::SeqCst), expected_calls);
        }
    }

    #[tokio::test]
    async fn test_page_failure_deletes_nothing() {
        let (dir, storage) = storage_with(&["keep.png", "orphan.png"]).await;
        let users = (1..=25).map(|id| user(id, None)).collect();
        let directory = Arc::new(FakeDirectory {
            users: Mutex::new(users),
            fail_at_offset: Some(10),
            calls: AtomicUsize::new(0),
        });

        let result = service(storage, directory).run_once().await;

        assert!(matches!(
            result,
            Err(ReconcileError::PageFailed { offset: 10, .. })
        ));
        assert_eq!(
            on_disk(&dir),
            vec!["keep.png".to_string(), "orphan.png".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_stop_pass() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png", "c.png", "kept.png"] {
            std::fs::write(dir.path().join(name), b"data").unwrap();
        }
        let storage = Arc::new(StuckFileStorage {
            inner: LocalStorage::new(dir.path()).await.unwrap(),
            stuck: "b.png".to_string(),
        });
        let directory = Arc::new(FakeDirectory::with_users(vec![user(1, Some("kept.png"))]));

        let report = ReconcileService::new(storage, directory, 10, Duration::from_secs(300))
            .run_once()
            .await
            .unwrap();

        assert_eq!(
            report.deleted,
            vec!["a.png".to_string(), "c.png".to_string()]
        );
        assert_eq!(report.failed, vec!["b.png".to_string()]);
        assert_eq!(
            on_disk(&dir),
            vec!["b.png".to_string(), "kept.png".to_string()]
        );
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_pass() {
        let (dir, storage) = storage_with(&[]).await;
        std::fs::remove_dir(dir.path()).unwrap();
        let directory = Arc::new(FakeDirectory::default());

        let result = service(storage, directory.clone()).run_once().await;

        assert!(matches!(result, Err(ReconcileError::ListFailed(_))));
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_overlapping_pass_is_skipped() {
        let (_dir, storage) = storage_with(&["a.png"]).await;
        let directory = Arc::new(BlockingDirectory {
            entered: Notify::new(),
            release: Notify::new(),
            blocked_once: AtomicBool::new(false),
        });
        let service = Arc::new(service(storage, directory.clone()));

        let first = {
            let service = service.clone();
            tokio::spawn(async move { service.run_once().await })
        };
        directory.entered.notified().await;

        assert!(matches!(
            service.run_once().await,
            Err(ReconcileError::AlreadyRunning)
        ));

        directory.release.notify_one();
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.deleted, vec!["a.png".to_string()]);

        // the flag is cleared once the pass finishes
        assert!(service.run_once().await.is_ok());
    }
}
