use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Restaurant Router Module
///
/// Reads are open to everyone; writes require the ADMIN role. Both rules live
/// in the access policy, which runs before any of these handlers.
pub fn restaurant_routes() -> Router<AppState> {
    Router::new()
        // GET /restaurants?page=&size=
        // Zero-based pages of restaurants with their dishes nested.
        // POST /restaurants
        // Creates a restaurant; 409 if the name is taken.
        .route(
            "/restaurants",
            get(handlers::list_restaurants).post(handlers::create_restaurant),
        )
        // GET /restaurants/search?cuisine=
        // Static segment, so it wins over `{id}`.
        .route("/restaurants/search", get(handlers::search_restaurants))
        // GET/PUT/DELETE /restaurants/{id}
        // DELETE removes the restaurant's dishes in the same transaction.
        .route(
            "/restaurants/{id}",
            get(handlers::get_restaurant)
                .put(handlers::update_restaurant)
                .delete(handlers::delete_restaurant),
        )
}
