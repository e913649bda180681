use std::sync::Arc;

use coach_engine::CoachService;
use server::{build_router, config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env().expect("Invalid configuration");
    tracing::info!(
        stockfish = %config.coach.stockfish_path,
        timeout_ms = config.coach.eval_timeout.as_millis() as u64,
        "Coach configured"
    );

    let service = Arc::new(CoachService::with_stockfish(&config.coach));

    // Start the engine in the background; coaching degrades until it answers
    tokio::spawn({
        let service = service.clone();
        async move {
            if service.check_engine().await {
                tracing::info!("Engine is up");
            } else {
                tracing::warn!("Engine unavailable - running with structural tips only");
            }
        }
    });

    let app = build_router(service);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
