use crate::analyzer_trait::{MotifAnalyzer, MoveContext};
use crate::board::promotion_rank;
use crate::motif::{Motif, MotifKind};
use shakmaty::{Move, Role};

/// A pawn reaches the last rank with a declared promotion piece.
pub struct PromotionAnalyzer;

impl MotifAnalyzer for PromotionAnalyzer {
    fn detect(&self, ctx: &MoveContext) -> Option<Motif> {
        match ctx.mv {
            Move::Normal { role: Role::Pawn, promotion: Some(_), to, .. }
                if to.rank() == promotion_rank(ctx.mover) =>
            {
                Some(Motif::new(MotifKind::Promotion, vec![*to]))
            }
            _ => None,
        }
    }
}
