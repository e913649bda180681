//! Runs every motif analyzer over one played move in a single pass.

use shakmaty::{Chess, Move, Position};

use crate::analyzer_trait::{MotifAnalyzer, MoveContext};
use crate::analyzers;
use crate::board::{parse_position, resolve_move};
use crate::motif::Motif;

/// Create all analyzer instances.
fn create_all_analyzers() -> Vec<Box<dyn MotifAnalyzer>> {
    vec![
        Box::new(analyzers::check::CheckAnalyzer),
        Box::new(analyzers::capture::CaptureAnalyzer),
        Box::new(analyzers::promotion::PromotionAnalyzer),
        Box::new(analyzers::back_rank_threat::BackRankThreatAnalyzer),
        Box::new(analyzers::knight_fork::KnightForkAnalyzer),
        Box::new(analyzers::hanging_piece::HangingPieceAnalyzer),
    ]
}

/// Detect all motifs for `mv` played from `before`, reaching `after`.
///
/// Every co-occurring motif is reported, sorted by dominance and deduplicated.
pub fn detect(before: &Chess, mv: &Move, after: &Chess) -> Vec<Motif> {
    let ctx = MoveContext {
        mv,
        before,
        after,
        mover: before.turn(),
    };

    let mut motifs: Vec<Motif> = create_all_analyzers()
        .iter()
        .filter_map(|analyzer| analyzer.detect(&ctx))
        .collect();

    motifs.sort();
    motifs.dedup();
    motifs
}

/// FEN-level entry point: resolves the move notation against the position
/// before it. Returns `None` if either FEN or the move cannot be interpreted.
pub fn detect_from_fens(before_fen: &str, notation: &str, after_fen: &str) -> Option<(Move, Vec<Motif>)> {
    let before = parse_position(before_fen)?;
    let after = parse_position(after_fen)?;
    let mv = resolve_move(&before, notation)?;
    let motifs = detect(&before, &mv, &after);
    Some((mv, motifs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motif::MotifKind;
    use shakmaty::Square;

    fn kinds(before: &str, notation: &str, after: &str) -> Vec<MotifKind> {
        let (_, motifs) = detect_from_fens(before, notation, after).expect("valid input");
        motifs.into_iter().map(|m| m.kind).collect()
    }

    #[test]
    fn test_quiet_queen_sortie_has_no_check_or_capture() {
        // 1. e4 e5 2. Qh5
        let found = kinds(
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2",
            "Qh5",
            "rnbqkbnr/pppp1ppp/8/4p2Q/4P3/8/PPPP1PPP/RNB1KBNR b KQkq - 1 2",
        );
        assert!(!found.contains(&MotifKind::Check));
        assert!(!found.contains(&MotifKind::Capture));
    }

    #[test]
    fn test_scholars_mate_check_and_capture() {
        let found = kinds(
            "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
            "h5f7",
            "r1bqkb1r/pppp1Qpp/2n2n2/4p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 4",
        );
        assert!(found.contains(&MotifKind::Check));
        assert!(found.contains(&MotifKind::Capture));
    }

    #[test]
    fn test_promotion() {
        let (_, motifs) = detect_from_fens(
            "8/4P3/8/8/8/8/k7/4K3 w - - 0 1",
            "e7e8q",
            "4Q3/8/8/8/8/8/k7/4K3 b - - 0 1",
        )
        .unwrap();
        let promo = motifs.iter().find(|m| m.kind == MotifKind::Promotion).unwrap();
        assert_eq!(promo.squares, vec![Square::E8]);
    }

    #[test]
    fn test_back_rank_threat() {
        // Black king boxed in by its own rook and pawns, white rook lifts to the open d-file
        let found = kinds(
            "6rk/6pp/8/8/8/8/5PPP/R5K1 w - - 0 1",
            "Rd1",
            "6rk/6pp/8/8/8/8/5PPP/3R2K1 b - - 1 1",
        );
        assert!(found.contains(&MotifKind::BackRankThreat));
        assert!(!found.contains(&MotifKind::Check));
    }

    #[test]
    fn test_no_back_rank_threat_with_sideways_king_move() {
        // Kf8 and Kh8 are still legal
        let found = kinds(
            "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1",
            "Rd1",
            "6k1/5ppp/8/8/8/8/5PPP/3R2K1 b - - 1 1",
        );
        assert!(!found.contains(&MotifKind::BackRankThreat));
    }

    #[test]
    fn test_no_back_rank_threat_with_luft() {
        let found = kinds(
            "6k1/5pp1/7p/8/8/8/5PPP/R5K1 w - - 0 1",
            "Rd1",
            "6k1/5pp1/7p/8/8/8/5PPP/3R2K1 b - - 1 1",
        );
        assert!(!found.contains(&MotifKind::BackRankThreat));
    }

    #[test]
    fn test_knight_fork() {
        // Nc7+ forks king on e8 and rook on a8
        let found = kinds(
            "r3k3/8/8/3N4/8/8/8/4K3 w - - 0 1",
            "Nc7+",
            "r3k3/2N5/8/8/8/8/8/4K3 b - - 1 1",
        );
        assert!(found.contains(&MotifKind::Fork));
        assert!(found.contains(&MotifKind::Check));
    }

    #[test]
    fn test_hanging_piece() {
        // Bishop steps onto a square the black pawn attacks, nothing defends it
        let found = kinds(
            "4k3/8/8/8/3p4/8/8/2B1K3 w - - 0 1",
            "c1e3",
            "4k3/8/8/8/3p4/4B3/8/4K3 b - - 1 1",
        );
        assert_eq!(found, vec![MotifKind::HangingPiece]);

        // Same square, but the king on f2 defends it
        let found = kinds(
            "4k3/8/8/8/3p4/8/5K2/2B5 w - - 0 1",
            "c1e3",
            "4k3/8/8/8/3p4/4B3/5K2/8 b - - 1 1",
        );
        assert!(!found.contains(&MotifKind::HangingPiece));

        // Safe square
        let found = kinds(
            "4k3/8/8/8/3p4/8/8/2B1K3 w - - 0 1",
            "Bf4",
            "4k3/8/8/8/3p1B2/8/8/4K3 b - - 1 1",
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_detect_is_deterministic() {
        let before = "r3k3/8/8/3N4/8/8/8/4K3 w - - 0 1";
        let after = "r3k3/2N5/8/8/8/8/8/4K3 b - - 1 1";
        assert_eq!(
            detect_from_fens(before, "d5c7", after),
            detect_from_fens(before, "d5c7", after)
        );
    }
}
