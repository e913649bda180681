#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chess_analyzers::board::{move_uci, resolve_move};
use coach_engine::{
    CoachConfig, CoachError, CoachService, Engine, EngineLauncher, EngineReport, PushMessage,
    RawScore, SearchBudget, Subscription, SyncRequest,
};
use shakmaty::{CastlingSide, Chess, Color, Position};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// ---------------------------------------------------------------------------
// Scripted engine
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Reply {
    report: EngineReport,
    delay: Duration,
}

/// Engine answers keyed by FEN. Unknown positions score 0.00 with no best move.
#[derive(Clone, Default)]
pub struct Script {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    down: Arc<AtomicBool>,
    pub launches: Arc<AtomicUsize>,
    pub searches: Arc<AtomicUsize>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, fen: &str, f: impl FnOnce(&mut Reply)) {
        let mut replies = self.replies.lock().unwrap();
        let reply = replies.entry(fen.to_string()).or_insert_with(|| Reply {
            report: EngineReport {
                best_move: None,
                score: Some(RawScore::Cp(0)),
                pv: Vec::new(),
            },
            delay: Duration::ZERO,
        });
        f(reply);
    }

    /// Centipawns relative to the side to move, like a UCI engine reports them.
    pub fn cp(&self, fen: &str, cp: i32, pv: &[&str]) {
        self.score(fen, RawScore::Cp(cp), pv);
    }

    pub fn mate(&self, fen: &str, moves: i32, pv: &[&str]) {
        self.score(fen, RawScore::Mate(moves), pv);
    }

    fn score(&self, fen: &str, score: RawScore, pv: &[&str]) {
        self.entry(fen, |reply| {
            reply.report = EngineReport {
                best_move: pv.first().map(|m| m.to_string()),
                score: Some(score),
                pv: pv.iter().map(|m| m.to_string()).collect(),
            };
        });
    }

    pub fn delay(&self, fen: &str, delay: Duration) {
        self.entry(fen, |reply| reply.delay = delay);
    }

    /// Engine cannot be started and running engines fail.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn launcher(&self) -> Arc<dyn EngineLauncher> {
        Arc::new(self.clone())
    }

    fn reply_for(&self, fen: &str) -> Option<Reply> {
        self.replies.lock().unwrap().get(fen).cloned()
    }
}

struct ScriptedEngine {
    script: Script,
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn analyse(&mut self, fen: &str, _budget: SearchBudget) -> Result<EngineReport, CoachError> {
        self.script.searches.fetch_add(1, Ordering::SeqCst);
        if self.script.down.load(Ordering::SeqCst) {
            return Err(CoachError::Engine("engine crashed".into()));
        }
        match self.script.reply_for(fen) {
            Some(reply) => {
                tokio::time::sleep(reply.delay).await;
                Ok(reply.report)
            }
            None => Ok(EngineReport {
                best_move: None,
                score: Some(RawScore::Cp(0)),
                pv: Vec::new(),
            }),
        }
    }

    async fn halt(&mut self) -> Result<(), CoachError> {
        Ok(())
    }
}

#[async_trait]
impl EngineLauncher for Script {
    async fn launch(&self) -> Result<Box<dyn Engine>, CoachError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(CoachError::EvaluatorUnavailable("stockfish not found".into()));
        }
        Ok(Box::new(ScriptedEngine {
            script: self.clone(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Service helpers
// ---------------------------------------------------------------------------

pub fn service(script: &Script) -> Arc<CoachService> {
    service_with_timeout(script, Duration::from_secs(3))
}

pub fn service_with_timeout(script: &Script, timeout: Duration) -> Arc<CoachService> {
    let config = CoachConfig {
        eval_timeout: timeout,
        ..CoachConfig::default()
    };
    Arc::new(CoachService::new(&config, script.launcher()))
}

pub fn sync_req(fen: &str, last_move: Option<&str>) -> SyncRequest {
    SyncRequest {
        fen: fen.to_string(),
        last_move: last_move.map(String::from),
        ..SyncRequest::default()
    }
}

/// Everything already queued on a subscription.
pub fn drain(sub: &mut Subscription) -> Vec<PushMessage> {
    let mut out = Vec::new();
    while let Some(msg) = sub.try_recv() {
        out.push(msg);
    }
    out
}

// ---------------------------------------------------------------------------
// Game helpers
// ---------------------------------------------------------------------------

/// One ply of a scripted game.
#[derive(Debug, Clone)]
pub struct Ply {
    pub uci: String,
    /// FEN after the move
    pub fen: String,
}

fn fen_of(pos: &Chess) -> String {
    let mut castling = String::new();
    for (color, side, c) in [
        (Color::White, CastlingSide::KingSide, 'K'),
        (Color::White, CastlingSide::QueenSide, 'Q'),
        (Color::Black, CastlingSide::KingSide, 'k'),
        (Color::Black, CastlingSide::QueenSide, 'q'),
    ] {
        if pos.castles().has(color, side) {
            castling.push(c);
        }
    }
    if castling.is_empty() {
        castling.push('-');
    }
    format!(
        "{} {} {} - {} {}",
        pos.board(),
        pos.turn().char(),
        castling,
        pos.halfmoves(),
        pos.fullmoves()
    )
}

/// Play SAN moves from the initial position, returning the FEN after each.
pub fn play_line(sans: &[&str]) -> Vec<Ply> {
    let mut pos = Chess::default();
    let mut plies = Vec::new();
    for san in sans {
        let mv = resolve_move(&pos, san).unwrap_or_else(|| panic!("illegal move {san}"));
        let uci = move_uci(&mv);
        pos.play_unchecked(mv);
        plies.push(Ply {
            uci,
            fen: fen_of(&pos),
        });
    }
    plies
}
