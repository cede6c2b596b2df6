//! Products API - product catalog REST server

use std::time::Duration;

use axum_helpers::server::{create_production_app, create_router};
use axum_helpers::parse_origins;
use core_config::tracing::{init_tracing, install_color_eyre};
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!("Connecting to MongoDB at {}", config.mongodb.redacted_url());

    let mongo_client =
        database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await?;
    let state = AppState::new(config, mongo_client);

    info!(
        "Successfully connected to MongoDB database: {}",
        state.config.mongodb.database()
    );

    api::init_indexes(&state).await?;
    tokio::fs::create_dir_all(&state.config.upload_dir).await?;

    let origins = parse_origins(&state.config.cors_origins)?;
    let router = create_router::<openapi::ApiDoc>(
        api::routes(&state),
        api::extra_routes(&state),
        origins,
    );

    info!(
        "Starting Products API on port {} (uploads in {})",
        state.config.server.port,
        state.config.upload_dir.display()
    );

    let mongo_client = state.mongo_client.clone();
    create_production_app(
        router,
        &state.config.server,
        Duration::from_secs(30),
        async move {
            info!("Shutting down: closing MongoDB connections");
            mongo_client.shutdown().await;
            info!("MongoDB connection closed");
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Products API shutdown complete");
    Ok(())
}
