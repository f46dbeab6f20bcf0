use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Dish Router Module
///
/// Every dish route is scoped to a restaurant: a dish id that belongs to a
/// different restaurant is reported as not found.
pub fn dish_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/restaurants/{id}/dishes",
            get(handlers::list_dishes).post(handlers::create_dish),
        )
        .route(
            "/restaurants/{id}/dishes/{dish_id}",
            get(handlers::get_dish)
                .put(handlers::update_dish)
                .delete(handlers::delete_dish),
        )
}
