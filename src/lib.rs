use std::sync::Arc;

use axum::{Router, http::HeaderName, middleware};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mapper;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;

use auth::{Policy, SigningKey, TokenCodec, TokenError};
use routes::{dishes, restaurants, system};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use services::{DishService, RestaurantService};

/// ApiDoc
///
/// OpenAPI document for the service, served at `/api-docs/openapi.json`.
/// Write operations declare the `bearer_auth` scheme registered by `SecurityAddon`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_restaurants, handlers::search_restaurants, handlers::get_restaurant,
        handlers::create_restaurant, handlers::update_restaurant, handlers::delete_restaurant,
        handlers::list_dishes, handlers::get_dish, handlers::create_dish,
        handlers::update_dish, handlers::delete_dish, handlers::get_me, handlers::health
    ),
    components(
        schemas(
            models::RestaurantRequest, models::DishRequest, models::RestaurantDto,
            models::DishDto, models::RestaurantPage, auth::Identity, error::ErrorBody,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "restaurants", description = "Restaurant catalogue"),
        (name = "dishes", description = "Dishes of a restaurant"),
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// AppState
///
/// The single container of shared services handed to every handler and to the
/// access-control middleware. Cloning is cheap: everything inside is an `Arc`
/// or `Copy`.
#[derive(Clone)]
pub struct AppState {
    pub restaurants: RestaurantService,
    pub dishes: DishService,
    /// Token codec built once from the configured secret; read-only afterwards.
    pub codec: Arc<TokenCodec>,
    pub policy: Policy,
    pub config: AppConfig,
}

impl AppState {
    /// Wires services and the token codec on top of `repo`.
    ///
    /// # Errors
    /// Fails if the configured secret or ttl cannot build a codec.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Result<Self, TokenError> {
        let key = SigningKey::new(&config.jwt_secret)?;
        let codec = TokenCodec::new(&key, config.jwt_ttl_secs)?;

        Ok(Self {
            restaurants: RestaurantService::new(repo.clone()),
            dishes: DishService::new(repo),
            codec: Arc::new(codec),
            policy: Policy::default(),
            config,
        })
    }
}

/// create_router
///
/// Assembles every route, installs the access-control layer and the
/// observability stack, and registers the application state.
///
/// The access-control middleware is a router-wide `layer`, not a `route_layer`:
/// it also guards the fallback, so an anonymous request to an unknown path is
/// answered 401 before it can learn whether the route exists.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Routes, fallback and access control
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(system::system_routes())
        .merge(restaurants::restaurant_routes())
        .merge(dishes::dish_routes())
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::access_control,
        ))
        .with_state(state);

    // 3. Observability and correlation (outside access control, so denials are traced too)
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS outermost
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, uri and the `x-request-id` set by
/// `SetRequestIdLayer`, so every line of one request correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
