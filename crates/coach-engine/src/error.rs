//! Coaching error types

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoachError {
    #[error("Invalid position: {0}")]
    InvalidState(String),

    #[error("Evaluator did not answer within {0:?}")]
    EvaluationTimeout(Duration),

    #[error("Evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),

    #[error("Delivery to subscriber {subscriber} failed: {reason}")]
    SubscriberDelivery { subscriber: u64, reason: &'static str },

    #[error("Engine protocol error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoachError {
    /// Errors after which the engine process should be considered unusable.
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, CoachError::EvaluatorUnavailable(_) | CoachError::Engine(_))
    }
}

impl From<chess_core::FenError> for CoachError {
    fn from(e: chess_core::FenError) -> Self {
        CoachError::InvalidState(e.to_string())
    }
}
