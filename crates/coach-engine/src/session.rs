//! The coaching session and the service that owns it.
//!
//! All ledger mutation happens under one async lock. A sync holds the lock
//! only while it updates the ledger and again while it commits results; the
//! engine round trip in between runs unlocked, so chat and newer syncs are
//! never stuck behind it. Each accepted sync bumps `epoch`; a sync that finds
//! a newer epoch at commit time discards its results.

use std::sync::Arc;

use chess_analyzers::board::{destination, move_san, move_uci, parse_position, resolve_move, uci_to_san};
use chess_analyzers::{detect, Motif, MotifKind};
use chess_core::{color_name, Position};
use serde::Serialize;
use shakmaty::{Chess, Color, Position as _};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::chat::{self, Advisory, AdvisoryLog, ChatContext};
use crate::classify::{classify, Classification, Thresholds};
use crate::config::CoachConfig;
use crate::error::CoachError;
use crate::evaluation::{Evaluation, SearchBudget};
use crate::evaluator::{EngineLauncher, EvaluatorBridge};
use crate::hub::{BroadcastHub, PushMessage, SubscriberId, Subscription};
use crate::ledger::{PositionLedger, SyncChange};
use crate::review::{self, DrillCandidate, PlyRecord, ReviewReport};
use crate::stockfish::StockfishLauncher;
use crate::tips::{self, ChallengeOutcome, CoachingTip, PlayedMove, PlyFacts};

#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    pub fen: String,
    pub pgn: String,
    pub last_move: Option<String>,
    pub turn: Option<Color>,
    pub player_color: Option<Color>,
    /// Set by the client when its rules engine reports the game finished
    pub game_over: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Same FEN as the current position
    Unchanged,
    Scored,
    /// Evaluation timed out or the ply could not be matched to a move
    Unscored,
    /// Engine unavailable; structural commentary only
    Degraded,
    /// A newer sync or a reset arrived first
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub status: SyncStatus,
    pub ply: u32,
    pub classification: Option<Classification>,
    pub motifs: Vec<MotifKind>,
    pub tip: Option<CoachingTip>,
    pub review: Option<ReviewReport>,
}

impl SyncOutcome {
    fn bare(status: SyncStatus, ply: u32) -> Self {
        Self {
            status,
            ply,
            classification: None,
            motifs: Vec::new(),
            tip: None,
            review: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Position to ask about; the ledger's current position when absent
    pub fen: Option<String>,
    pub pgn: Option<String>,
    pub question: String,
    pub player_color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub answer: String,
    pub engine_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeReply {
    pub outcome: ChallengeOutcome,
    pub tip: Option<CoachingTip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub fen: String,
    pub turn: &'static str,
    pub ply: u32,
    /// PGN moves, or the synced `last_move`s when no PGN was sent
    pub moves: Vec<String>,
    pub is_game_over: bool,
    pub player_color: Option<&'static str>,
    pub scored_plies: usize,
    pub engine_available: bool,
    pub subscribers: usize,
    pub advisories: usize,
    pub last_advisory: Option<Advisory>,
    pub last_tip: Option<CoachingTip>,
    pub drill: Option<DrillCandidate>,
}

/// Board facts for a sync that advanced exactly one ply.
struct PlyStructure {
    before: Chess,
    played: PlayedMove,
    motifs: Vec<Motif>,
}

enum Scoring {
    Scored { before: Evaluation, after: Evaluation },
    /// No move to classify, only the new position was evaluated
    AfterOnly(Evaluation),
    Superseded,
    Failed(CoachError),
}

struct Session {
    ledger: PositionLedger,
    log: Vec<PlyRecord>,
    drill: Option<DrillCandidate>,
    last_tip: Option<CoachingTip>,
    advisories: AdvisoryLog,
    epoch: u64,
    player_color: Option<Color>,
    engine_available: bool,
    game_over: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            ledger: PositionLedger::new(),
            log: Vec::new(),
            drill: None,
            last_tip: None,
            advisories: AdvisoryLog::default(),
            epoch: 0,
            player_color: None,
            engine_available: true,
            game_over: false,
        }
    }
}

pub struct CoachService {
    session: Mutex<Session>,
    bridge: EvaluatorBridge,
    hub: BroadcastHub,
    thresholds: Thresholds,
    eval_budget: SearchBudget,
    chat_budget: SearchBudget,
}

impl CoachService {
    pub fn new(config: &CoachConfig, launcher: Arc<dyn EngineLauncher>) -> Self {
        Self {
            session: Mutex::new(Session::new()),
            bridge: EvaluatorBridge::new(launcher, config.eval_timeout),
            hub: BroadcastHub::new(config.hub_buffer),
            thresholds: config.thresholds,
            eval_budget: config.eval_budget,
            chat_budget: config.chat_budget,
        }
    }

    pub fn with_stockfish(config: &CoachConfig) -> Self {
        let launcher = StockfishLauncher {
            path: config.stockfish_path.clone(),
            threads: config.engine_threads,
            hash_mb: config.engine_hash_mb,
        };
        Self::new(config, Arc::new(launcher))
    }

    /// Ingest a position from the client: evaluate, classify, comment and
    /// broadcast.
    pub async fn sync(&self, req: SyncRequest) -> Result<SyncOutcome, CoachError> {
        let (change, epoch) = {
            let mut session = self.session.lock().await;
            let change = session.ledger.sync(
                &req.fen,
                &req.pgn,
                req.last_move.as_deref(),
                req.turn,
            )?;
            if req.player_color.is_some() {
                session.player_color = req.player_color;
            }

            let Some(change) = change else {
                let ply = session.ledger.current().ply;
                let mut outcome = SyncOutcome::bare(SyncStatus::Unchanged, ply);
                if req.game_over && !session.game_over {
                    session.game_over = true;
                    outcome.review = Some(self.finish_game(&mut session));
                }
                return Ok(outcome);
            };

            if change.rewound {
                let ply = change.current.ply;
                session.log.retain(|r| r.ply < ply);
                session.drill = None;
                info!(ply, "takeback, classification log truncated");
            }
            session.epoch += 1;
            session.last_tip = None;
            session.game_over = req.game_over || change.current.reported_result().is_some();
            self.hub.publish(state_update(&change.current, session.game_over));
            (change, session.epoch)
        };

        let ply = change.current.ply;
        let structure = read_ply(&change);
        if structure.is_none() && !change.rewound && change.current.ply > 0 {
            debug!(ply, "sync is not a single known move, ply left unscored");
        }

        let scoring = self.score(&change, structure.is_some()).await;

        let mut session = self.session.lock().await;
        if session.epoch != epoch {
            debug!(ply, "sync superseded before commit");
            return Ok(SyncOutcome::bare(SyncStatus::Superseded, ply));
        }

        let mover = change.current.mover();
        let mut outcome = SyncOutcome::bare(SyncStatus::Unscored, ply);
        let mut verdict = None;
        let mut tip_evaluation = None;
        let mut before_best = None;
        let mut commentary = false;

        match scoring {
            Scoring::Superseded => {
                return Ok(SyncOutcome::bare(SyncStatus::Superseded, ply));
            }
            Scoring::Scored { before, after } => {
                self.note_engine(&mut session, true);
                session.ledger.cache_evaluation(after.clone());
                if let Some(s) = &structure {
                    let matched = before.best_move.as_deref().map(|best| best == s.played.uci);
                    verdict = Some(classify(&before.score, &after.score, mover, &self.thresholds, matched));
                }
                before_best = before.best_move;
                tip_evaluation = Some(after);
                outcome.status = SyncStatus::Scored;
                commentary = true;
            }
            Scoring::AfterOnly(after) => {
                self.note_engine(&mut session, true);
                session.ledger.cache_evaluation(after);
            }
            Scoring::Failed(CoachError::EvaluationTimeout(limit)) => {
                info!(ply, timeout_ms = limit.as_millis() as u64, "ply unscored, no tip");
            }
            Scoring::Failed(e) => {
                warn!(ply, error = %e, "evaluator unavailable, structural tips only");
                self.note_engine(&mut session, false);
                outcome.status = SyncStatus::Degraded;
                commentary = true;
            }
        }

        if let Some(s) = &structure {
            let classification = verdict.map(|v| v.classification);
            let motif_kinds = sorted_kinds(&s.motifs);

            session.log.push(PlyRecord {
                ply,
                mover,
                fen_before: change.previous.fen.clone(),
                played_move: s.played.uci.clone(),
                played_san: s.played.san.clone(),
                best_move: before_best.clone(),
                classification,
                loss: verdict.map_or(0, |v| v.loss),
                motifs: motif_kinds.clone(),
            });

            if commentary {
                let better = before_best.as_deref().and_then(|uci| uci_to_san(&s.before, uci));
                let facts = PlyFacts {
                    position: &change.current,
                    mover,
                    played: Some(&s.played),
                    better_move: better.as_deref(),
                };
                outcome.tip = tips::synthesize(classification, &s.motifs, tip_evaluation.as_ref(), &facts);
            }
            outcome.classification = classification;
            outcome.motifs = motif_kinds;
        }

        if let Some(tip) = &outcome.tip {
            session.last_tip = Some(tip.clone());
            let report = self.hub.publish(PushMessage::CoachTip(tip.clone()));
            debug!(ply, delivered = report.delivered, dropped = report.dropped.len(), "tip published");
        }

        if session.game_over {
            outcome.review = Some(self.finish_game(&mut session));
        }

        Ok(outcome)
    }

    /// Evaluate the positions this sync needs. Before-move evaluation is only
    /// requested when there is a move to classify and no cached result.
    async fn score(&self, change: &SyncChange, needs_before: bool) -> Scoring {
        let before = if needs_before {
            match change.previous_eval.clone() {
                Some(eval) => Some(eval),
                None => match self.bridge.evaluate(&change.previous, self.eval_budget).await {
                    Ok(Some(eval)) => Some(eval),
                    Ok(None) => return Scoring::Superseded,
                    Err(e) => return Scoring::Failed(e),
                },
            }
        } else {
            None
        };

        match self.bridge.evaluate(&change.current, self.eval_budget).await {
            Ok(Some(after)) => match before {
                Some(before) => Scoring::Scored { before, after },
                None => Scoring::AfterOnly(after),
            },
            Ok(None) => Scoring::Superseded,
            Err(e) => Scoring::Failed(e),
        }
    }

    fn note_engine(&self, session: &mut Session, available: bool) {
        if session.engine_available != available {
            session.engine_available = available;
            info!(available, "engine status changed");
            self.hub.publish(PushMessage::EngineStatus { available });
        }
    }

    fn finish_game(&self, session: &mut Session) -> ReviewReport {
        let report = review::review(&session.log);
        session.drill = report.blunder.clone();
        info!(
            lessons = report.lessons.len(),
            drill = report.blunder.is_some(),
            "game over, review published"
        );
        self.hub.publish(PushMessage::GameReview(report.clone()));
        report
    }

    /// Review of the game so far. Also refreshes the drill candidate.
    pub async fn review(&self) -> ReviewReport {
        let mut session = self.session.lock().await;
        let report = review::review(&session.log);
        session.drill = report.blunder.clone();
        report
    }

    /// Back to the starting position with an empty log. Any evaluation in
    /// flight is abandoned.
    pub async fn reset(&self) -> Arc<Position> {
        let mut session = self.session.lock().await;
        self.bridge.cancel_pending();

        session.ledger.reset();
        session.log.clear();
        session.drill = None;
        session.last_tip = None;
        session.game_over = false;
        session.epoch += 1;

        let current = session.ledger.current();
        self.hub.publish(state_update(&current, false));
        info!("session reset");
        current
    }

    /// Answer a free-text question. Never touches the ledger or the log.
    pub async fn chat(&self, req: ChatRequest) -> Result<ChatReply, CoachError> {
        let question = req.question.trim();
        if question.is_empty() {
            return Err(CoachError::InvalidState("question is empty".into()));
        }

        let (position, cached, last, player) = {
            let session = self.session.lock().await;
            let position = match req.fen.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
                Some(fen) => Arc::new(Position::from_sync(fen, req.pgn.as_deref().unwrap_or(""), None)?),
                None => session.ledger.current(),
            };
            let cached = session
                .ledger
                .cached_evaluation()
                .filter(|e| e.fen == position.fen)
                .cloned();
            (
                position,
                cached,
                session.log.last().cloned(),
                req.player_color.or(session.player_color),
            )
        };

        let evaluation = match cached {
            Some(eval) => Some(eval),
            None => match self.bridge.consult(&position, self.chat_budget).await {
                Ok(eval) => Some(eval),
                Err(e) => {
                    warn!(error = %e, "chat answered without engine");
                    None
                }
            },
        };

        let ctx = ChatContext {
            position: &position,
            evaluation: evaluation.as_ref(),
            last: last.as_ref(),
            player,
        };
        let text = chat::answer(question, &ctx);

        let mut session = self.session.lock().await;
        session.advisories.push(Advisory {
            question: question.to_string(),
            answer: text.clone(),
            fen: position.fen.clone(),
            asked_at: chrono::Utc::now(),
        });

        Ok(ChatReply {
            answer: text,
            engine_available: evaluation.is_some(),
        })
    }

    /// Check a clicked square against the current tip's challenge. A correct
    /// answer publishes a confirmation tip that carries no challenge.
    pub async fn answer_challenge(&self, square: &str) -> ChallengeReply {
        let mut session = self.session.lock().await;
        let outcome = tips::resolve_challenge(session.last_tip.as_ref(), square);
        let tip = match outcome {
            ChallengeOutcome::Solved => session.last_tip.as_ref().and_then(tips::confirmation_tip),
            _ => None,
        };
        if let Some(tip) = &tip {
            session.last_tip = Some(tip.clone());
            self.hub.publish(PushMessage::CoachTip(tip.clone()));
        }
        debug!(?outcome, square, "challenge answered");
        ChallengeReply { outcome, tip }
    }

    /// Join the push channel. The first messages are the current state, the
    /// engine status if it is down, and the last tip.
    pub async fn subscribe(&self) -> Subscription {
        let session = self.session.lock().await;
        let mut greeting = vec![state_update(&session.ledger.current(), session.game_over)];
        if !session.engine_available {
            greeting.push(PushMessage::EngineStatus { available: false });
        }
        if let Some(tip) = &session.last_tip {
            greeting.push(PushMessage::CoachTip(tip.clone()));
        }
        self.hub.subscribe_with(greeting)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Start the engine and record whether it answers.
    pub async fn check_engine(&self) -> bool {
        let start = Position::starting();
        let available = match self.bridge.consult(&start, self.chat_budget).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "engine check failed");
                false
            }
        };
        let mut session = self.session.lock().await;
        self.note_engine(&mut session, available);
        available
    }

    pub async fn status(&self) -> SessionStatus {
        let session = self.session.lock().await;
        let current = session.ledger.current();
        SessionStatus {
            fen: current.fen.clone(),
            turn: color_name(current.side_to_move),
            ply: current.ply,
            moves: if current.moves.is_empty() {
                session
                    .ledger
                    .history()
                    .iter()
                    .filter_map(|entry| entry.last_move.clone())
                    .collect()
            } else {
                current.moves.clone()
            },
            is_game_over: session.game_over,
            player_color: session.player_color.map(color_name),
            scored_plies: session.log.iter().filter(|r| r.classification.is_some()).count(),
            engine_available: session.engine_available,
            subscribers: self.hub.subscriber_count(),
            advisories: session.advisories.count(),
            last_advisory: session.advisories.latest().cloned(),
            last_tip: session.last_tip.clone(),
            drill: session.drill.clone(),
        }
    }
}

fn state_update(position: &Position, is_game_over: bool) -> PushMessage {
    PushMessage::StateUpdate {
        fen: position.fen.clone(),
        turn: color_name(position.side_to_move).to_string(),
        ply: position.ply,
        is_game_over,
    }
}

/// Resolve the move behind a one-ply sync and read its motifs. `None` when
/// the move is missing, illegal, or does not lead to the synced board.
fn read_ply(change: &SyncChange) -> Option<PlyStructure> {
    if !change.is_single_step() {
        return None;
    }
    let before = parse_position(&change.previous.fen)?;
    let after = parse_position(&change.current.fen)?;
    let mv = resolve_move(&before, change.current.last_move.as_deref()?)?;

    let mut played_board = before.clone();
    played_board.play_unchecked(mv.clone());
    if played_board.board() != after.board() {
        return None;
    }

    let motifs = detect(&before, &mv, &after);
    let played = PlayedMove {
        san: move_san(&before, &mv),
        uci: move_uci(&mv),
        to: destination(&mv),
    };
    Some(PlyStructure {
        before,
        played,
        motifs,
    })
}

fn sorted_kinds(motifs: &[Motif]) -> Vec<MotifKind> {
    let mut kinds: Vec<MotifKind> = motifs.iter().map(|m| m.kind).collect();
    kinds.sort();
    kinds.dedup();
    kinds
}
