use crate::analyzer_trait::{MotifAnalyzer, MoveContext};
use crate::motif::{Motif, MotifKind};
use shakmaty::Position;

/// The move leaves the opponent's king attacked.
pub struct CheckAnalyzer;

impl MotifAnalyzer for CheckAnalyzer {
    fn detect(&self, ctx: &MoveContext) -> Option<Motif> {
        if !ctx.after.is_check() {
            return None;
        }
        let king_sq = ctx.after.board().king_of(!ctx.mover)?;
        Some(Motif::new(MotifKind::Check, vec![king_sq]))
    }
}
