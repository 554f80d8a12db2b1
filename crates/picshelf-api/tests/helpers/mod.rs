//! Test helpers: build AppState and router for integration tests.
//!
//! Each app gets its own in-memory SQLite database and temporary storage root, and a
//! frozen clock so storage names are predictable.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use picshelf_api::setup::routes;
use picshelf_api::AppState;
use picshelf_core::Config;
use picshelf_storage::{FixedClock, LocalStorage, NameAllocator, Storage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Clock value every test app is frozen at.
pub const TEST_CLOCK_MILLIS: i64 = 1_700_000_000_000;

/// API path prefix for tests.
pub fn api_path(path: &str) -> String {
    format!("{}{}", picshelf_api::constants::API_PREFIX, path)
}

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn storage_root(&self) -> PathBuf {
        self.state.config.storage_root.clone()
    }

    /// Names of the files currently in the storage root, sorted.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.storage_root())
            .expect("Failed to read storage root")
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }
}

/// Setup test app with default limits.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup test app, letting the caller adjust the config first.
pub async fn setup_test_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

    let mut config = Config {
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        storage_root: temp_dir.path().join("storage"),
        ..Config::default()
    };
    customize(&mut config);

    let pool = picshelf_db::connect_and_migrate(
        &config.database_url,
        config.db_max_connections,
        Duration::from_secs(5),
    )
    .await
    .expect("Failed to set up test database");

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(&config.storage_root)
            .await
            .expect("Failed to create local storage"),
    );

    let allocator = NameAllocator::new(Arc::new(FixedClock(TEST_CLOCK_MILLIS)));
    let state = Arc::new(AppState::new(config, pool, storage, allocator));

    let app = routes::setup_routes(&state.config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

/// A form with one `profilePic` part.
pub fn profile_pic_form(file_name: &str, mime_type: &str, data: Vec<u8>) -> MultipartForm {
    let part = Part::bytes(bytes::Bytes::from(data))
        .file_name(file_name.to_string())
        .mime_type(mime_type.to_string());
    MultipartForm::new().add_part("profilePic", part)
}

/// Create a user through the API and return its id.
pub async fn create_user(client: &TestServer, name: &str, email: &str) -> i64 {
    let response = client
        .post(&api_path("/user/create"))
        .json(&serde_json::json!({ "name": name, "email": email }))
        .await;
    assert_eq!(response.status_code(), 200);

    let users: Vec<serde_json::Value> = client.get(&api_path("/user")).await.json();
    users
        .iter()
        .filter(|u| u["email"] == email)
        .filter_map(|u| u["id"].as_i64())
        .max()
        .expect("Created user not listed")
}
