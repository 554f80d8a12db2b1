//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use picshelf_core::Config;

/// Hard failures come from `Config::validate`; this adds warnings for risky but legal values.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if !config.is_production() && config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
    }

    if config.upload_max_mb() > 100 {
        tracing::warn!(
            upload_max_mb = config.upload_max_mb(),
            "Upload limit above 100MB, uploads are buffered in memory"
        );
    }

    if config.db_max_connections > 1 && config.database_url.contains(":memory:") {
        tracing::warn!("In-memory database is limited to a single connection");
    }

    Ok(())
}
