use std::sync::Arc;

use axum::{Extension, Json};
use chess_core::parse_color;
use coach_engine::{
    ChallengeReply, ChatReply, ChatRequest, CoachService, ReviewReport, SessionStatus,
    SyncOutcome, SyncRequest,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use shakmaty::Color;

use crate::error::AppError;

#[derive(Deserialize)]
pub struct SyncBody {
    pub fen: String,
    #[serde(default)]
    pub pgn: String,
    pub last_move: Option<String>,
    pub turn: Option<String>,
    pub player_color: Option<String>,
    #[serde(default)]
    pub game_over: bool,
}

#[derive(Deserialize)]
pub struct ChatBody {
    pub fen: Option<String>,
    pub pgn: Option<String>,
    pub question: String,
    pub player_color: Option<String>,
}

#[derive(Deserialize)]
pub struct ChallengeBody {
    pub square: String,
}

/// Optional color field: absent or empty is `None`, anything else must parse.
fn color_field(
    name: &str,
    value: Option<&str>,
) -> Result<Option<Color>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_color(v)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("invalid {name} '{v}'"))),
    }
}

/// POST /api/sync
/// Push the client's current position; returns what the coach made of it.
pub async fn sync(
    Extension(service): Extension<Arc<CoachService>>,
    Json(body): Json<SyncBody>,
) -> Result<Json<SyncOutcome>, AppError> {
    let req = SyncRequest {
        turn: color_field("turn", body.turn.as_deref())?,
        player_color: color_field("player_color", body.player_color.as_deref())?,
        fen: body.fen,
        pgn: body.pgn,
        last_move: body.last_move,
        game_over: body.game_over,
    };
    Ok(Json(service.sync(req).await?))
}

/// POST /api/chat
pub async fn chat(
    Extension(service): Extension<Arc<CoachService>>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, AppError> {
    let req = ChatRequest {
        player_color: color_field("player_color", body.player_color.as_deref())?,
        fen: body.fen,
        pgn: body.pgn,
        question: body.question,
    };
    Ok(Json(service.chat(req).await?))
}

/// POST /api/review
pub async fn review(Extension(service): Extension<Arc<CoachService>>) -> Json<ReviewReport> {
    Json(service.review().await)
}

/// POST /api/reset
pub async fn reset(Extension(service): Extension<Arc<CoachService>>) -> Json<JsonValue> {
    let position = service.reset().await;
    Json(json!({ "status": "reset", "fen": position.fen }))
}

/// POST /api/challenge
/// A square clicked in answer to the current tip's challenge.
pub async fn challenge(
    Extension(service): Extension<Arc<CoachService>>,
    Json(body): Json<ChallengeBody>,
) -> Json<ChallengeReply> {
    Json(service.answer_challenge(&body.square).await)
}

/// GET /status
pub async fn status(Extension(service): Extension<Arc<CoachService>>) -> Json<SessionStatus> {
    Json(service.status().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coach_engine::{
        Classification, CoachConfig, CoachError, Engine, EngineLauncher, EngineReport, RawScore,
        SearchBudget, SyncStatus,
    };

    /// Always +0.20 for the side to move.
    struct SteadyEngine;

    #[async_trait]
    impl Engine for SteadyEngine {
        async fn analyse(&mut self, _fen: &str, _budget: SearchBudget) -> Result<EngineReport, CoachError> {
            Ok(EngineReport {
                best_move: None,
                score: Some(RawScore::Cp(20)),
                pv: Vec::new(),
            })
        }

        async fn halt(&mut self) -> Result<(), CoachError> {
            Ok(())
        }
    }

    struct SteadyLauncher;

    #[async_trait]
    impl EngineLauncher for SteadyLauncher {
        async fn launch(&self) -> Result<Box<dyn Engine>, CoachError> {
            Ok(Box::new(SteadyEngine))
        }
    }

    fn service() -> Arc<CoachService> {
        Arc::new(CoachService::new(&CoachConfig::default(), Arc::new(SteadyLauncher)))
    }

    fn body(fen: &str, last_move: Option<&str>, turn: Option<&str>) -> SyncBody {
        SyncBody {
            fen: fen.to_string(),
            pgn: String::new(),
            last_move: last_move.map(String::from),
            turn: turn.map(String::from),
            player_color: Some("white".into()),
            game_over: false,
        }
    }

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    #[tokio::test]
    async fn test_sync_scores_move() {
        let service = service();
        let Json(outcome) = sync(Extension(service.clone()), Json(body(AFTER_E4, Some("e2e4"), Some("b"))))
            .await
            .unwrap();
        assert_eq!(outcome.status, SyncStatus::Scored);
        assert_eq!(outcome.ply, 1);
        // +0.20 for White before, -0.20 after: 40cp lost, no best-move hint
        assert_eq!(outcome.classification, Some(Classification::Good));

        let Json(status) = status(Extension(service)).await;
        assert_eq!(status.fen, AFTER_E4);
        assert_eq!(status.player_color, Some("white"));
    }

    #[tokio::test]
    async fn test_sync_rejects_bad_input() {
        let service = service();
        let err = sync(Extension(service.clone()), Json(body(AFTER_E4, None, Some("red"))))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = sync(Extension(service.clone()), Json(body("8/8/8 w - - 0 1", None, None)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = sync(Extension(service), Json(body(AFTER_E4, None, Some("w"))))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_reset_and_empty_review() {
        let service = service();
        let Json(outcome) = sync(Extension(service.clone()), Json(body(AFTER_E4, Some("e2e4"), None)))
            .await
            .unwrap();
        assert_eq!(outcome.ply, 1);
        let Json(reply) = reset(Extension(service.clone())).await;
        assert_eq!(reply["status"], "reset");
        assert_eq!(reply["fen"], chess_core::STANDARD_START_FEN);

        let Json(report) = review(Extension(service)).await;
        assert!(report.blunder.is_none());
        assert!(report.lessons.is_empty());
    }

    #[tokio::test]
    async fn test_chat_requires_question() {
        let service = service();
        let err = chat(
            Extension(service.clone()),
            Json(ChatBody { fen: None, pgn: None, question: "  ".into(), player_color: None }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let Json(reply) = chat(
            Extension(service),
            Json(ChatBody { fen: None, pgn: None, question: "Who is winning?".into(), player_color: None }),
        )
        .await
        .unwrap();
        assert!(reply.engine_available);
        assert!(reply.answer.contains("balanced"));
    }

    #[tokio::test]
    async fn test_challenge_without_tip() {
        let Json(reply) = challenge(Extension(service()), Json(ChallengeBody { square: "e4".into() })).await;
        assert_eq!(reply.outcome, coach_engine::ChallengeOutcome::NoChallenge);
        assert!(reply.tip.is_none());
    }
}
