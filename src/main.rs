use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rajarani::{api, broadcast, config::ServerConfig, state::AppState, store::MemoryStore};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rajarani=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Raja Rani room server...");

    let config = ServerConfig::from_env();
    let store = Arc::new(MemoryStore::new());

    if let Some(path) = &config.snapshot_path {
        if path.exists() {
            match store.load_from(path).await {
                Ok(()) => tracing::info!("Restored rooms from {}", path.display()),
                Err(e) => tracing::warn!("Ignoring snapshot {}: {}", path.display(), e),
            }
        }
        broadcast::spawn_snapshot_writer(store.clone(), path.clone(), config.snapshot_interval);
    }

    let state = Arc::new(AppState::with_store(store, &config));

    let app = api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await
}
