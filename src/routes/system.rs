use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// System Router Module
pub fn system_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer probe. Public.
        .route("/health", get(handlers::health))
        // GET /me
        // Requires a valid token; answers with the resolved identity.
        .route("/me", get(handlers::get_me))
}
