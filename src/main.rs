use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use api_governor::{
    config::{Config, StoreBackend},
    db,
    ratelimit::{spawn_pruner, CounterStore, MemoryCounterStore, PgCounterStore},
    routes::create_router,
    utils::init_logger,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);
    info!(
        enabled = config.rate_limit.enabled,
        window_secs = config.rate_limit.window.as_secs(),
        max_requests = config.rate_limit.max_requests,
        store = ?config.rate_limit.store,
        "Rate limiting configured"
    );

    let store: Arc<dyn CounterStore> = match config.rate_limit.store {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database).await?;

            info!("Running database migrations...");
            db::run_migrations(&pool).await?;
            info!("Database migrations completed");

            Arc::new(PgCounterStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory rate limit store; counters are per-process and lost on restart");
            Arc::new(MemoryCounterStore::new())
        }
    };

    let pruner = spawn_pruner(store.clone(), &config.rate_limit);

    // Create shared state
    let state = AppState::new(config.clone(), store);

    // Create router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    if let Some(pruner) = pruner {
        pruner.abort();
    }

    info!("Server stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
