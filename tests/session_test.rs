//! Integration tests: the sync pipeline, push channel and coaching
//! interactions against a scripted engine.

use std::sync::atomic::Ordering;
use std::time::Duration;

use chess_analyzers::MotifKind;
use coach_engine::{
    ChallengeOutcome, ChatRequest, Classification, Emphasis, HotSquare, PushMessage, SyncStatus,
};

mod common;
use common::{drain, play_line, service, service_with_timeout, sync_req, Script};

const AFTER_E4_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";

fn tips(messages: &[PushMessage]) -> usize {
    messages
        .iter()
        .filter(|m| matches!(m, PushMessage::CoachTip(_)))
        .count()
}

/// Script for 1. e4 e5 2. Qg4?? and a service already synced to move 2.
async fn queen_drop() -> (Script, std::sync::Arc<coach_engine::CoachService>, String) {
    let qg4 = play_line(&["e4", "e5", "Qg4"]).remove(2);
    let script = Script::new();
    script.cp(AFTER_E4_E5, 30, &["g1f3"]);
    script.cp(&qg4.fen, 880, &["d7d6", "f1c4", "c8g4"]);

    let svc = service(&script);
    let first = svc.sync(sync_req(AFTER_E4_E5, Some("e7e5"))).await.unwrap();
    // Jumping in at move two: nothing to classify
    assert_eq!(first.status, SyncStatus::Unscored);
    assert!(first.tip.is_none());
    (script, svc, qg4.fen)
}

#[tokio::test]
async fn test_queen_drop_gets_red_square_and_challenge() {
    let (_script, svc, qg4_fen) = queen_drop().await;

    let outcome = svc.sync(sync_req(&qg4_fen, Some("Qg4"))).await.unwrap();
    assert_eq!(outcome.status, SyncStatus::Scored);
    assert_eq!(outcome.ply, 3);
    assert_eq!(outcome.classification, Some(Classification::Blunder));

    let tip = outcome.tip.expect("tip for a blunder");
    assert!(tip.message.starts_with("Blunder."));
    assert!(tip.message.contains("Nf3 was stronger"));
    assert_eq!(
        tip.hot_squares[0],
        HotSquare {
            square: "g4".to_string(),
            kind: Emphasis::Red,
        }
    );
    assert_eq!(tip.challenge.as_ref().map(|c| c.target_square.as_str()), Some("d6"));
}

#[tokio::test]
async fn test_quiet_queen_sortie_is_not_a_blunder() {
    let qh5 = play_line(&["e4", "e5", "Qh5"]).remove(2);
    let script = Script::new();
    script.cp(AFTER_E4_E5, 30, &["g1f3"]);
    script.cp(&qh5.fen, 10, &["b8c6"]);
    let svc = service(&script);

    svc.sync(sync_req(AFTER_E4_E5, None)).await.unwrap();
    let outcome = svc.sync(sync_req(&qh5.fen, Some("d1h5"))).await.unwrap();

    assert_eq!(outcome.classification, Some(Classification::Good));
    assert!(!outcome.motifs.contains(&MotifKind::Check));
    assert!(!outcome.motifs.contains(&MotifKind::Capture));
    let tip = outcome.tip.unwrap();
    assert_eq!(tip.hot_squares[0].kind, Emphasis::Gold);
    assert!(tip.challenge.is_none());
}

#[tokio::test]
async fn test_newer_sync_supersedes_slow_evaluation() {
    let line = play_line(&["e4", "e5"]);
    let script = Script::new();
    script.delay(&line[0].fen, Duration::from_millis(300));
    let svc = service(&script);
    let mut sub = svc.subscribe().await;
    drain(&mut sub);

    let slow = {
        let svc = svc.clone();
        let req = sync_req(&line[0].fen, Some(&line[0].uci));
        tokio::spawn(async move { svc.sync(req).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let fresh = svc.sync(sync_req(&line[1].fen, Some(&line[1].uci))).await.unwrap();
    let stale = slow.await.unwrap().unwrap();

    assert_eq!(stale.status, SyncStatus::Superseded);
    assert!(stale.tip.is_none());
    assert_eq!(fresh.status, SyncStatus::Scored);
    assert!(fresh.tip.is_some());

    let pushed = drain(&mut sub);
    assert_eq!(tips(&pushed), 1);
    assert!(matches!(pushed.last(), Some(PushMessage::CoachTip(_))));
    assert!(matches!(
        pushed.first(),
        Some(PushMessage::StateUpdate { ply: 1, .. })
    ));

    let status = svc.status().await;
    assert_eq!(status.ply, 2);
    assert_eq!(status.scored_plies, 1);
}

#[tokio::test]
async fn test_timeout_leaves_ply_unscored() {
    let line = play_line(&["e4", "e5"]);
    let script = Script::new();
    script.delay(&line[0].fen, Duration::from_millis(500));
    let svc = service_with_timeout(&script, Duration::from_millis(100));
    let mut sub = svc.subscribe().await;
    drain(&mut sub);

    let outcome = svc.sync(sync_req(&line[0].fen, Some(&line[0].uci))).await.unwrap();
    assert_eq!(outcome.status, SyncStatus::Unscored);
    assert!(outcome.classification.is_none());
    assert!(outcome.tip.is_none());

    let pushed = drain(&mut sub);
    assert_eq!(pushed.len(), 1);
    assert!(matches!(pushed[0], PushMessage::StateUpdate { ply: 1, .. }));
    // A timeout is not an outage
    assert!(svc.status().await.engine_available);

    script.delay(&line[0].fen, Duration::ZERO);
    let next = svc.sync(sync_req(&line[1].fen, Some(&line[1].uci))).await.unwrap();
    assert_eq!(next.status, SyncStatus::Scored);
    assert_eq!(svc.status().await.scored_plies, 1);
}

#[tokio::test]
async fn test_engine_outage_degrades_to_motif_tips() {
    let line = play_line(&["e4", "d5", "exd5", "Qxd5"]);
    let script = Script::new();
    script.set_down(true);
    let svc = service(&script);
    let mut sub = svc.subscribe().await;
    drain(&mut sub);

    let first = svc.sync(sync_req(&line[0].fen, Some(&line[0].uci))).await.unwrap();
    assert_eq!(first.status, SyncStatus::Degraded);
    assert!(first.tip.is_none());
    svc.sync(sync_req(&line[1].fen, Some(&line[1].uci))).await.unwrap();

    let capture = svc.sync(sync_req(&line[2].fen, Some(&line[2].uci))).await.unwrap();
    assert_eq!(capture.status, SyncStatus::Degraded);
    assert!(capture.classification.is_none());
    assert!(capture.motifs.contains(&MotifKind::Capture));
    let tip = capture.tip.expect("structural tip");
    assert_eq!(tip.message, "White captures on d5.");
    assert!(tip.challenge.is_none());

    let status = svc.status().await;
    assert!(!status.engine_available);
    assert_eq!(status.scored_plies, 0);

    script.set_down(false);
    let recovered = svc.sync(sync_req(&line[3].fen, Some(&line[3].uci))).await.unwrap();
    assert_eq!(recovered.status, SyncStatus::Scored);

    let statuses: Vec<bool> = drain(&mut sub)
        .into_iter()
        .filter_map(|m| match m {
            PushMessage::EngineStatus { available } => Some(available),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![false, true]);
}

#[tokio::test]
async fn test_takeback_truncates_log() {
    let line = play_line(&["e4", "e5", "Nf3"]);
    let script = Script::new();
    let svc = service(&script);
    for ply in &line {
        svc.sync(sync_req(&ply.fen, Some(&ply.uci))).await.unwrap();
    }
    assert_eq!(svc.status().await.scored_plies, 3);

    let back = svc.sync(sync_req(&line[0].fen, Some(&line[0].uci))).await.unwrap();
    assert_ne!(back.status, SyncStatus::Scored);
    assert!(back.tip.is_none());

    let status = svc.status().await;
    assert_eq!(status.ply, 1);
    assert_eq!(status.moves, vec![line[0].uci.clone()]);
    assert_eq!(status.scored_plies, 0);
    assert!(status.last_tip.is_none());

    // Replaying the same move is scored again
    let again = svc.sync(sync_req(&line[1].fen, Some(&line[1].uci))).await.unwrap();
    assert_eq!(again.ply, 2);
    assert_eq!(svc.status().await.scored_plies, 1);
}

#[tokio::test]
async fn test_repeated_sync_does_not_reevaluate() {
    let line = play_line(&["e4"]);
    let script = Script::new();
    let svc = service(&script);

    svc.sync(sync_req(&line[0].fen, Some(&line[0].uci))).await.unwrap();
    let searches = script.searches.load(Ordering::SeqCst);

    let repeat = svc.sync(sync_req(&line[0].fen, Some(&line[0].uci))).await.unwrap();
    assert_eq!(repeat.status, SyncStatus::Unchanged);
    assert!(repeat.tip.is_none());
    assert_eq!(script.searches.load(Ordering::SeqCst), searches);
    assert_eq!(svc.status().await.scored_plies, 1);
}

#[tokio::test]
async fn test_wrong_turn_is_rejected() {
    let line = play_line(&["e4"]);
    let svc = service(&Script::new());
    let mut req = sync_req(&line[0].fen, Some(&line[0].uci));
    req.turn = Some(shakmaty::Color::White);
    assert!(svc.sync(req).await.is_err());
    assert_eq!(svc.status().await.ply, 0);
}

#[tokio::test]
async fn test_subscribers_see_identical_order() {
    let line = play_line(&["e4", "e5", "Nf3"]);
    let svc = service(&Script::new());
    let mut a = svc.subscribe().await;
    let mut b = svc.subscribe().await;

    for ply in &line {
        svc.sync(sync_req(&ply.fen, Some(&ply.uci))).await.unwrap();
    }

    let seen_a = drain(&mut a);
    let seen_b = drain(&mut b);
    // greeting, then state + tip per ply
    assert_eq!(seen_a.len(), 7);
    assert_eq!(seen_a, seen_b);

    let mut late_sub = svc.subscribe().await;
    let late = drain(&mut late_sub);
    assert_eq!(late.len(), 2);
    assert!(matches!(late[0], PushMessage::StateUpdate { ply: 3, .. }));
    assert!(matches!(late[1], PushMessage::CoachTip(_)));
    assert_eq!(svc.status().await.subscribers, 3);

    assert!(svc.unsubscribe(a.id));
    assert_eq!(svc.status().await.subscribers, 2);
}

#[tokio::test]
async fn test_challenge_answer_flow() {
    let (_script, svc, qg4_fen) = queen_drop().await;
    let mut sub = svc.subscribe().await;
    svc.sync(sync_req(&qg4_fen, Some("d1g4"))).await.unwrap();
    drain(&mut sub);

    let missed = svc.answer_challenge("e7").await;
    assert_eq!(missed.outcome, ChallengeOutcome::Missed);
    assert!(missed.tip.is_none());

    let solved = svc.answer_challenge("D6").await;
    assert_eq!(solved.outcome, ChallengeOutcome::Solved);
    let confirmation = solved.tip.expect("confirmation tip");
    assert!(confirmation.challenge.is_none());
    assert_eq!(confirmation.hot_squares[0].square, "d6");

    let pushed = drain(&mut sub);
    assert_eq!(pushed, vec![PushMessage::CoachTip(confirmation)]);
    let json = serde_json::to_value(&pushed[0]).unwrap();
    assert_eq!(json["type"], "coach_tip");
    assert_eq!(json["hot_squares"][0]["type"], "gold");
    assert!(json["challenge"].is_null());

    let again = svc.answer_challenge("d6").await;
    assert_eq!(again.outcome, ChallengeOutcome::NoChallenge);
}

#[tokio::test]
async fn test_chat_leaves_game_state_alone() {
    let (_script, svc, qg4_fen) = queen_drop().await;
    svc.sync(sync_req(&qg4_fen, Some("d1g4"))).await.unwrap();
    let before = svc.status().await;

    let reply = svc
        .chat(ChatRequest {
            question: "Who is better here?".to_string(),
            ..ChatRequest::default()
        })
        .await
        .unwrap();
    assert!(reply.engine_available);
    assert!(!reply.answer.is_empty());

    let after = svc.status().await;
    assert_eq!(after.fen, before.fen);
    assert_eq!(after.scored_plies, before.scored_plies);
    assert_eq!(after.last_tip, before.last_tip);
    assert_eq!(after.advisories, 1);
    let advisory = after.last_advisory.expect("recorded question");
    assert_eq!(advisory.question, "Who is better here?");
    assert_eq!(advisory.answer, reply.answer);
    assert_eq!(advisory.fen, qg4_fen);

    let empty = svc
        .chat(ChatRequest {
            question: "   ".to_string(),
            ..ChatRequest::default()
        })
        .await;
    assert!(empty.is_err());
}

#[tokio::test]
async fn test_chat_without_engine_still_answers() {
    let script = Script::new();
    script.set_down(true);
    let svc = service(&script);

    let reply = svc
        .chat(ChatRequest {
            fen: Some(AFTER_E4_E5.to_string()),
            question: "What should I play?".to_string(),
            ..ChatRequest::default()
        })
        .await
        .unwrap();
    assert!(!reply.engine_available);
    assert!(!reply.answer.is_empty());
    assert_eq!(svc.status().await.ply, 0);
}
