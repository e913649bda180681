//! Position ledger: the authoritative current position and its history.

use std::sync::Arc;

use chess_core::{color_name, Position};
use shakmaty::Color;
use tracing::debug;

use crate::error::CoachError;
use crate::evaluation::Evaluation;

/// One accepted sync, in ply order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub ply: u32,
    pub fen: String,
    pub last_move: Option<String>,
}

/// What a sync changed.
#[derive(Debug, Clone)]
pub struct SyncChange {
    pub previous: Arc<Position>,
    pub current: Arc<Position>,
    /// Evaluation cached for `previous`, if one finished before this sync
    pub previous_eval: Option<Evaluation>,
    /// The new ply is not ahead of the old one (takeback or new game)
    pub rewound: bool,
}

impl SyncChange {
    /// The new position follows the previous one by exactly one move.
    pub fn is_single_step(&self) -> bool {
        !self.rewound
            && self.previous.ply.checked_add(1) == Some(self.current.ply)
            && self.current.last_move.is_some()
    }
}

#[derive(Debug)]
pub struct PositionLedger {
    current: Arc<Position>,
    history: Vec<HistoryEntry>,
    cached_eval: Option<Evaluation>,
}

impl Default for PositionLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionLedger {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Position::starting()),
            history: Vec::new(),
            cached_eval: None,
        }
    }

    /// Immutable snapshot of the current position.
    pub fn current(&self) -> Arc<Position> {
        self.current.clone()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Replace the current position. `Ok(None)` when the FEN is unchanged.
    pub fn sync(
        &mut self,
        fen: &str,
        pgn: &str,
        last_move: Option<&str>,
        turn: Option<Color>,
    ) -> Result<Option<SyncChange>, CoachError> {
        let next = Position::from_sync(fen, pgn, last_move)?;

        if let Some(turn) = turn {
            if turn != next.side_to_move {
                return Err(CoachError::InvalidState(format!(
                    "turn says {} but the FEN has {} to move",
                    color_name(turn),
                    color_name(next.side_to_move)
                )));
            }
        }

        if next.fen == self.current.fen {
            return Ok(None);
        }

        let rewound = next.ply <= self.current.ply;
        if rewound {
            self.history.retain(|entry| entry.ply < next.ply);
            debug!(from = self.current.ply, to = next.ply, "ledger rewound");
        }
        self.history.push(HistoryEntry {
            ply: next.ply,
            fen: next.fen.clone(),
            last_move: next.last_move.clone(),
        });

        let current = Arc::new(next);
        let previous = std::mem::replace(&mut self.current, current.clone());
        let previous_eval = self
            .cached_eval
            .take()
            .filter(|eval| eval.fen == previous.fen);

        Ok(Some(SyncChange {
            previous,
            current,
            previous_eval,
            rewound,
        }))
    }

    /// Remember the evaluation of the current position. Ignored if the
    /// position has moved on since it was requested.
    pub fn cache_evaluation(&mut self, eval: Evaluation) -> bool {
        if eval.fen != self.current.fen {
            return false;
        }
        self.cached_eval = Some(eval);
        true
    }

    pub fn cached_evaluation(&self) -> Option<&Evaluation> {
        self.cached_eval.as_ref()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
