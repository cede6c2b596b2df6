//! API routes module

pub mod health;
pub mod products;

use axum::Router;
use axum_helpers::health_router;
use tower_http::services::ServeDir;

use crate::state::{AppState, UPLOADS_PATH};

/// Routes mounted under `/api`
pub fn routes(state: &AppState) -> Router {
    Router::new().nest("/products", products::router(state))
}

/// Probes and stored thumbnails, mounted at the root
pub fn extra_routes(state: &AppState) -> Router {
    Router::new()
        .merge(health_router(state.config.app))
        .merge(health::router(state.clone()))
        .nest_service(UPLOADS_PATH, ServeDir::new(&state.config.upload_dir))
}

/// Initialize database indexes
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    products::init_indexes(state).await
}
