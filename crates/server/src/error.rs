use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coach_engine::CoachError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<CoachError> for AppError {
    fn from(e: CoachError) -> Self {
        match e {
            CoachError::InvalidState(_) => AppError::BadRequest(e.to_string()),
            CoachError::EvaluationTimeout(_) => AppError::Timeout(e.to_string()),
            CoachError::EvaluatorUnavailable(_) | CoachError::Engine(_) => {
                AppError::Unavailable(e.to_string())
            }
            CoachError::SubscriberDelivery { .. } | CoachError::Config(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Anyhow(e) => {
                tracing::error!("Unexpected error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        // Error body: {"detail": "message"}
        (status, Json(json!({ "detail": message }))).into_response()
    }
}
