use crate::analyzer_trait::{MotifAnalyzer, MoveContext};
use crate::board::piece_value;
use crate::motif::{Motif, MotifKind};
use shakmaty::{Move, Position, Role};

/// The moved piece (minor or heavier) lands where the opponent attacks it and
/// no friendly piece defends it.
pub struct HangingPieceAnalyzer;

const MIN_VALUE: i32 = 3;

impl MotifAnalyzer for HangingPieceAnalyzer {
    fn detect(&self, ctx: &MoveContext) -> Option<Motif> {
        let (role, to) = match ctx.mv {
            Move::Normal { role, promotion, to, .. } => (promotion.unwrap_or(*role), *to),
            _ => return None,
        };
        if role == Role::King || piece_value(role) < MIN_VALUE {
            return None;
        }

        let board = ctx.after.board();
        let occupied = board.occupied();

        let attackers = board.attacks_to(to, !ctx.mover, occupied);
        if attackers.is_empty() {
            return None;
        }

        let defenders = board.attacks_to(to, ctx.mover, occupied);
        if !defenders.is_empty() {
            return None;
        }

        Some(Motif::new(MotifKind::HangingPiece, vec![to]))
    }
}
