//! Jobboard Server - Main entry point

use chrono::Duration;
use std::net::SocketAddr;
use std::sync::Arc;

use jobboard_core::{
    api::{self, AppState},
    auth::TokenService,
    config::Config,
    lifecycle::{LifecycleController, TransitionRules},
    notify::StoreNotifier,
    service::BoardService,
    store::{MemoryStore, PgStore, Store},
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config: {}. Using defaults.", e);
        Config::default()
    });

    telemetry::init_logging(&config.observability)?;
    telemetry::describe_metrics();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Jobboard Server"
    );

    // Pick the storage backend
    let store: Arc<dyn Store> = match &config.database {
        Some(database) => {
            let pg = PgStore::connect(&database.url, database.max_connections).await?;
            if database.run_migrations {
                pg.migrate().await?;
                tracing::info!("Database migrations applied");
            }
            tracing::info!("Connected to database");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("No database configured, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let rules = if config.lifecycle.strict_transitions {
        TransitionRules::Strict
    } else {
        TransitionRules::Lax
    };
    let lifecycle = LifecycleController::new(rules);

    let notifier = Arc::new(StoreNotifier::new(store.clone()));
    let service = Arc::new(BoardService::new(store, lifecycle, notifier));
    let tokens = Arc::new(TokenService::new(
        &config.auth.jwt_secret,
        Duration::seconds(config.auth.token_ttl_seconds),
    ));

    let state = AppState { service, tokens };
    let app = api::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
