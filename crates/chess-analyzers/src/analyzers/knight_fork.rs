use crate::analyzer_trait::{MotifAnalyzer, MoveContext};
use crate::motif::{Motif, MotifKind};
use shakmaty::{attacks, Move, Position, Role};

/// Knight fork: the moved knight attacks the opponent king AND at least one
/// rook or queen simultaneously.
pub struct KnightForkAnalyzer;

impl MotifAnalyzer for KnightForkAnalyzer {
    fn detect(&self, ctx: &MoveContext) -> Option<Motif> {
        let to_sq = match ctx.mv {
            Move::Normal { role: Role::Knight, to, .. } => *to,
            _ => return None,
        };

        let board_after = ctx.after.board();
        let opponent_color = !ctx.mover;
        let reach = attacks::knight_attacks(to_sq);

        let king_sq = board_after.king_of(opponent_color)?;
        if !reach.contains(king_sq) {
            return None;
        }

        let targets: Vec<_> = reach
            .into_iter()
            .filter(|&sq| {
                board_after.piece_at(sq).is_some_and(|piece| {
                    piece.color == opponent_color
                        && (piece.role == Role::Queen || piece.role == Role::Rook)
                })
            })
            .collect();

        if targets.is_empty() {
            return None;
        }

        let mut squares = vec![to_sq, king_sq];
        squares.extend(targets);
        Some(Motif::new(MotifKind::Fork, squares))
    }
}
