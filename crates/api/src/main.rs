use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use procforge_api::config::{ServerConfig, StoreBackend};
use procforge_api::engine::HttpDeploymentGateway;
use procforge_api::router::build_app_router;
use procforge_api::state::AppState;
use procforge_core::deployment::{DeploymentGateway, LocalDeploymentGateway};
use procforge_db::{CatalogStore, DbPool, InMemoryCatalogStore, PgCatalogStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Store ---
    let (store, pool): (Arc<dyn CatalogStore>, Option<DbPool>) = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set");

            let pool = procforge_db::create_pool(database_url, config.db_max_connections)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            procforge_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            procforge_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let store: Arc<dyn CatalogStore> = Arc::new(PgCatalogStore::new(pool.clone()));
            (store, Some(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            let store: Arc<dyn CatalogStore> = Arc::new(InMemoryCatalogStore::new());
            (store, None)
        }
    };

    // --- Deployment gateway ---
    let gateway: Arc<dyn DeploymentGateway> = match &config.gateway_url {
        Some(url) => {
            let timeout = Duration::from_secs(config.gateway_timeout_secs);
            let client = HttpDeploymentGateway::new(url, timeout)
                .expect("Failed to configure deployment gateway");
            tracing::info!(url = %url, "Using remote workflow engine");
            Arc::new(client)
        }
        None => {
            tracing::info!("DEPLOYMENT_GATEWAY_URL not set, using in-process engine");
            Arc::new(LocalDeploymentGateway::new())
        }
    };

    // --- App state and router ---
    let state = AppState::new(store, gateway, config.clone());
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if let Some(pool) = pool {
        let limit = Duration::from_secs(config.shutdown_timeout_secs);
        if tokio::time::timeout(limit, pool.close()).await.is_err() {
            tracing::warn!(
                timeout_secs = config.shutdown_timeout_secs,
                "Timed out closing database pool"
            );
        } else {
            tracing::info!("Database pool closed");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "procforge_api=debug,procforge_catalog=debug,tower_http=debug".into()
    });
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
