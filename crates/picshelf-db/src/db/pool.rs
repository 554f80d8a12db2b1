//! Connection pool setup and migrations

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Accepts either a full `sqlite:` URL or a bare filesystem path.
fn connect_options(database_url: &str) -> anyhow::Result<SqliteConnectOptions> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }
        format!("sqlite://{}", database_url)
    };

    let options = SqliteConnectOptions::from_str(&url)
        .with_context(|| format!("Invalid database url {}", database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let options = if url.contains(":memory:") {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    Ok(options)
}

/// Closing the only connection of an in-memory database drops its contents, so that
/// connection is never recycled.
fn pool_options(
    in_memory: bool,
    max_connections: u32,
    acquire_timeout: Duration,
) -> SqlitePoolOptions {
    let options = SqlitePoolOptions::new().acquire_timeout(acquire_timeout);
    if in_memory {
        options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options
            .max_connections(max_connections)
            .idle_timeout(Duration::from_secs(600))
    }
}

/// Open a connection pool without running migrations.
///
/// In-memory databases are private to a connection, so they are always opened with a
/// single connection regardless of `max_connections`.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> anyhow::Result<SqlitePool> {
    let options = connect_options(database_url)?;
    let in_memory = database_url.contains(":memory:");

    tracing::info!(max_connections, in_memory, "Connecting to database...");
    let pool = pool_options(in_memory, max_connections, acquire_timeout)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(max_connections, "Database connected successfully");
    Ok(pool)
}

/// Apply the embedded migrations from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}

pub async fn connect_and_migrate(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> anyhow::Result<SqlitePool> {
    let pool = connect(database_url, max_connections, acquire_timeout).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
