//! Database setup and initialization

use anyhow::Result;
use picshelf_core::Config;
use sqlx::SqlitePool;
use std::time::Duration;

/// Setup database connection pool and run migrations
pub async fn setup_database(config: &Config) -> Result<SqlitePool> {
    picshelf_db::connect_and_migrate(
        &config.database_url,
        config.db_max_connections,
        Duration::from_secs(config.db_timeout_seconds),
    )
    .await
}
