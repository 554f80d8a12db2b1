use picshelf_api::{setup, telemetry};
use picshelf_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    telemetry::init_telemetry(&config)?;

    // Initialize the application (database, storage, services, routes)
    let (state, router) = setup::initialize_app(config).await?;

    let background_tasks = setup::services::start_background_tasks(&state);

    let served = setup::server::start_server(&state.config, router).await;

    for task in background_tasks {
        task.abort();
    }
    state.pool.close().await;
    tracing::info!("Shutdown complete");

    served
}
