use crate::analyzer_trait::{MotifAnalyzer, MoveContext};
use crate::board::home_rank;
use crate::motif::{Motif, MotifKind};
use shakmaty::{attacks, Bitboard, Move, Position, Role};

/// Back rank threat: after the move the opponent's king sits on its home rank
/// with no legal non-capturing king move at all, and one of the mover's rooks
/// or queens can land on the rank next ply. A heuristic, not a mate search.
pub struct BackRankThreatAnalyzer;

impl MotifAnalyzer for BackRankThreatAnalyzer {
    fn detect(&self, ctx: &MoveContext) -> Option<Motif> {
        let defender = !ctx.mover;
        let board = ctx.after.board();
        let king_sq = board.king_of(defender)?;
        let back_rank = home_rank(defender);

        if king_sq.rank() != back_rank {
            return None;
        }

        // `after` has the defender to move, so its legal list is the escape list.
        let can_step = ctx
            .after
            .legal_moves()
            .iter()
            .any(|m| matches!(m, Move::Normal { role: Role::King, capture: None, .. }));
        if can_step {
            return None;
        }

        let occupied = board.occupied();
        let own = board.by_color(ctx.mover);
        let rank_bb = Bitboard::from_rank(back_rank);
        let heavy = (board.by_role(Role::Rook) | board.by_role(Role::Queen)) & own;

        let reaches_rank = heavy.into_iter().any(|sq| {
            let reach = match board.role_at(sq) {
                Some(Role::Queen) => attacks::queen_attacks(sq, occupied),
                _ => attacks::rook_attacks(sq, occupied),
            };
            !(reach & rank_bb & !own).is_empty()
        });

        reaches_rank.then(|| Motif::new(MotifKind::BackRankThreat, vec![king_sq]))
    }
}
