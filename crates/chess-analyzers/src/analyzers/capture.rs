use crate::analyzer_trait::{MotifAnalyzer, MoveContext};
use crate::motif::{Motif, MotifKind};
use shakmaty::{Move, Position, Square};

/// The move lands on a square held by an opposing piece. En passant counts
/// too, anchored on the pawn that disappears.
pub struct CaptureAnalyzer;

impl MotifAnalyzer for CaptureAnalyzer {
    fn detect(&self, ctx: &MoveContext) -> Option<Motif> {
        if let Move::EnPassant { from, to } = ctx.mv {
            let victim = Square::from_coords(to.file(), from.rank());
            return Some(Motif::new(MotifKind::Capture, vec![victim]));
        }

        let to = ctx.mv.to();
        let piece = ctx.before.board().piece_at(to)?;
        // Castling encodes the king "capturing" its own rook
        if piece.color == ctx.mover {
            return None;
        }
        Some(Motif::new(MotifKind::Capture, vec![to]))
    }
}
