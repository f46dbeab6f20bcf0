use crate::{
    AppState,
    auth::Identity,
    error::{AppError, ErrorBody},
    models::{
        CuisineFilter, DishDto, DishRequest, PageParams, RestaurantDto, RestaurantPage,
        RestaurantRequest,
    },
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
};

// Handlers take their extractors as `Result`s so malformed input comes back as
// a VALIDATION_FAILED body instead of axum's plain-text rejection.

// --- Restaurants ---

/// list_restaurants
///
/// [Public Route] One page of restaurants ordered by id, dishes nested.
#[utoipa::path(
    get,
    path = "/restaurants",
    tag = "restaurants",
    params(PageParams),
    responses(
        (status = 200, description = "Page of restaurants", body = RestaurantPage),
        (status = 400, description = "Bad paging parameters", body = ErrorBody)
    )
)]
pub async fn list_restaurants(
    State(state): State<AppState>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<RestaurantPage>, AppError> {
    let Query(params) = query?;
    Ok(Json(state.restaurants.list(params).await?))
}

/// search_restaurants
///
/// [Public Route] Restaurants whose cuisine equals `cuisine`, ignoring case.
#[utoipa::path(
    get,
    path = "/restaurants/search",
    tag = "restaurants",
    params(CuisineFilter),
    responses(
        (status = 200, description = "Matching restaurants", body = [RestaurantDto]),
        (status = 400, description = "Missing cuisine", body = ErrorBody)
    )
)]
pub async fn search_restaurants(
    State(state): State<AppState>,
    query: Result<Query<CuisineFilter>, QueryRejection>,
) -> Result<Json<Vec<RestaurantDto>>, AppError> {
    let Query(filter) = query?;
    Ok(Json(state.restaurants.search(&filter.cuisine).await?))
}

/// get_restaurant
///
/// [Public Route] A single restaurant with its dishes.
#[utoipa::path(
    get,
    path = "/restaurants/{id}",
    tag = "restaurants",
    params(("id" = i64, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Found", body = RestaurantDto),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_restaurant(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<RestaurantDto>, AppError> {
    let Path(id) = path?;
    Ok(Json(state.restaurants.get(id).await?))
}

/// create_restaurant
///
/// [Admin Route] Creates a restaurant. Names are unique: a second create with
/// the same name is a 409.
#[utoipa::path(
    post,
    path = "/restaurants",
    tag = "restaurants",
    request_body = RestaurantRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Created", body = RestaurantDto),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 409, description = "Duplicate name", body = ErrorBody)
    )
)]
pub async fn create_restaurant(
    identity: Identity,
    State(state): State<AppState>,
    payload: Result<Json<RestaurantRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RestaurantDto>), AppError> {
    let Json(request) = payload?;
    tracing::info!(actor = identity.actor(), "create restaurant requested");
    let created = state.restaurants.create(&request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// update_restaurant
///
/// [Admin Route] Replaces name, cuisine and address.
#[utoipa::path(
    put,
    path = "/restaurants/{id}",
    tag = "restaurants",
    params(("id" = i64, Path, description = "Restaurant ID")),
    request_body = RestaurantRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated", body = RestaurantDto),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Duplicate name", body = ErrorBody)
    )
)]
pub async fn update_restaurant(
    identity: Identity,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RestaurantRequest>, JsonRejection>,
) -> Result<Json<RestaurantDto>, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    tracing::info!(actor = identity.actor(), id, "update restaurant requested");
    Ok(Json(state.restaurants.update(id, &request).await?))
}

/// delete_restaurant
///
/// [Admin Route] Deletes a restaurant and, with it, every one of its dishes.
#[utoipa::path(
    delete,
    path = "/restaurants/{id}",
    tag = "restaurants",
    params(("id" = i64, Path, description = "Restaurant ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_restaurant(
    identity: Identity,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = path?;
    tracing::info!(actor = identity.actor(), id, "delete restaurant requested");
    state.restaurants.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Dishes ---

/// list_dishes
///
/// [Public Route] All dishes of a restaurant, ordered by id.
#[utoipa::path(
    get,
    path = "/restaurants/{id}/dishes",
    tag = "dishes",
    params(("id" = i64, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Dishes", body = [DishDto]),
        (status = 404, description = "Restaurant not found", body = ErrorBody)
    )
)]
pub async fn list_dishes(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<DishDto>>, AppError> {
    let Path(restaurant_id) = path?;
    Ok(Json(state.dishes.list(restaurant_id).await?))
}

/// get_dish
///
/// [Public Route] One dish of a restaurant.
#[utoipa::path(
    get,
    path = "/restaurants/{id}/dishes/{dish_id}",
    tag = "dishes",
    params(
        ("id" = i64, Path, description = "Restaurant ID"),
        ("dish_id" = i64, Path, description = "Dish ID")
    ),
    responses(
        (status = 200, description = "Found", body = DishDto),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_dish(
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<DishDto>, AppError> {
    let Path((restaurant_id, dish_id)) = path?;
    Ok(Json(state.dishes.get(restaurant_id, dish_id).await?))
}

/// create_dish
///
/// [Admin Route] Adds a dish to an existing restaurant.
#[utoipa::path(
    post,
    path = "/restaurants/{id}/dishes",
    tag = "dishes",
    params(("id" = i64, Path, description = "Restaurant ID")),
    request_body = DishRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Created", body = DishDto),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Restaurant not found", body = ErrorBody)
    )
)]
pub async fn create_dish(
    identity: Identity,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<DishRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DishDto>), AppError> {
    let Path(restaurant_id) = path?;
    let Json(request) = payload?;
    tracing::info!(actor = identity.actor(), restaurant_id, "create dish requested");
    let created = state.dishes.create(restaurant_id, &request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// update_dish
///
/// [Admin Route] Replaces a dish's fields.
#[utoipa::path(
    put,
    path = "/restaurants/{id}/dishes/{dish_id}",
    tag = "dishes",
    params(
        ("id" = i64, Path, description = "Restaurant ID"),
        ("dish_id" = i64, Path, description = "Dish ID")
    ),
    request_body = DishRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated", body = DishDto),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_dish(
    identity: Identity,
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
    payload: Result<Json<DishRequest>, JsonRejection>,
) -> Result<Json<DishDto>, AppError> {
    let Path((restaurant_id, dish_id)) = path?;
    let Json(request) = payload?;
    tracing::info!(actor = identity.actor(), restaurant_id, dish_id, "update dish requested");
    Ok(Json(
        state.dishes.update(restaurant_id, dish_id, &request).await?,
    ))
}

/// delete_dish
///
/// [Admin Route] Removes one dish.
#[utoipa::path(
    delete,
    path = "/restaurants/{id}/dishes/{dish_id}",
    tag = "dishes",
    params(
        ("id" = i64, Path, description = "Restaurant ID"),
        ("dish_id" = i64, Path, description = "Dish ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_dish(
    identity: Identity,
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path((restaurant_id, dish_id)) = path?;
    tracing::info!(actor = identity.actor(), restaurant_id, dish_id, "delete dish requested");
    state.dishes.delete(restaurant_id, dish_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Account & Ops ---

/// get_me
///
/// [Authenticated Route] Echoes the caller's identity as derived from the token.
#[utoipa::path(
    get,
    path = "/me",
    tag = "account",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller identity", body = Identity),
        (status = 401, description = "No identity", body = ErrorBody)
    )
)]
pub async fn get_me(identity: Identity) -> Json<Identity> {
    Json(identity)
}

/// health
///
/// [Public Route] Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "ops",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// not_found
///
/// Fallback for unknown routes. Only reached by authenticated callers: the
/// access policy answers 401 to anonymous requests for unlisted paths first.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
