pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use coach_engine::CoachService;
use tower_http::cors::{Any, CorsLayer};

/// All HTTP and WebSocket routes over one coaching service.
pub fn build_router(service: Arc<CoachService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        .route("/status", get(routes::coach::status))
        // Coaching
        .route("/api/sync", post(routes::coach::sync))
        .route("/api/chat", post(routes::coach::chat))
        .route("/api/review", post(routes::coach::review))
        .route("/api/reset", post(routes::coach::reset))
        .route("/api/challenge", post(routes::coach::challenge))
        // Push channel
        .route("/ws", get(routes::ws::ws_handler))
        // Shared state
        .layer(Extension(service))
        .layer(cors)
}
