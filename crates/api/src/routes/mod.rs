pub mod campaigns;
pub mod health;
pub mod settings;

use axum::Router;
use axum::extract::DefaultBodyLimit;

use crate::state::AppState;

/// Largest accepted request body (recipient uploads travel inline).
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(campaigns::router())
        .merge(settings::router())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
