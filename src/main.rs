use restaurant_service::{
    AppState,
    auth::ADMIN,
    config::{AppConfig, Env},
    create_router,
    repository::{MemoryRepository, PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, storage, then the HTTP server.
/// Any failure before the listener is bound aborts startup.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().unwrap_or_else(|err| {
        eprintln!("FATAL: invalid configuration: {err}");
        std::process::exit(1);
    });

    // 2. Logging: RUST_LOG wins, otherwise crate-level debug.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "restaurant_service=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!(config = ?config, "Application starting in {:?} mode", config.env);

    // 3. Storage: Postgres when configured, in-memory otherwise (local only;
    // production config refuses to load without DATABASE_URL).
    let repo: RepositoryState = match config.db_url.as_deref() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            let repo = PostgresRepository::new(pool);
            repo.migrate()
                .await
                .expect("FATAL: Failed to apply database migrations.");
            Arc::new(repo) as RepositoryState
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage; data is lost on exit");
            Arc::new(MemoryRepository::new()) as RepositoryState
        }
    };

    // 4. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(repo, config)
        .expect("FATAL: Failed to build the token codec from JWT_SECRET.");

    if app_state.config.env == Env::Local {
        match app_state.codec.issue("local-admin", [ADMIN]) {
            Ok(token) => tracing::info!("Local ADMIN token: Bearer {token}"),
            Err(err) => tracing::warn!(%err, "could not issue local ADMIN token"),
        }
    }

    // 5. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind BIND_ADDR.");

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
