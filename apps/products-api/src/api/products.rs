//! Products API routes

use axum::Router;
use domain_products::handlers;
use tracing::info;

use crate::state::AppState;

/// Create products router
pub fn router(state: &AppState) -> Router {
    handlers::router(state.product_service())
}

/// Ensure the unique title index and query indexes exist
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    state.product_dao().init_indexes().await?;
    info!("Product indexes ready");
    Ok(())
}
