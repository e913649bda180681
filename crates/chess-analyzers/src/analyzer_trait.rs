//! Base trait and types for motif analyzers.

use shakmaty::{Chess, Color, Move};

use crate::motif::Motif;

/// Context available to analyzers for one played move.
pub struct MoveContext<'a> {
    pub mv: &'a Move,
    pub before: &'a Chess, // Board state BEFORE the move
    pub after: &'a Chess,  // Board state AFTER the move
    pub mover: Color,
}

/// Trait that all motif analyzers implement. Analyzers are stateless, so the
/// same input always yields the same answer.
pub trait MotifAnalyzer: Send + Sync {
    /// Inspect a single move.
    fn detect(&self, ctx: &MoveContext) -> Option<Motif>;
}
