//! Board helpers: FEN → position, move resolution, material values.

use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, File, Move, Position, Rank, Role, Square};

// Piece values for material calculation
pub const PAWN_VALUE: i32 = 1;
pub const KNIGHT_VALUE: i32 = 3;
pub const BISHOP_VALUE: i32 = 3;
pub const ROOK_VALUE: i32 = 5;
pub const QUEEN_VALUE: i32 = 9;

/// Piece value (no king)
pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => PAWN_VALUE,
        Role::Knight => KNIGHT_VALUE,
        Role::Bishop => BISHOP_VALUE,
        Role::Rook => ROOK_VALUE,
        Role::Queen => QUEEN_VALUE,
        Role::King => 0,
    }
}

/// Rank a side's king and pieces start on.
pub fn home_rank(color: Color) -> Rank {
    match color {
        Color::White => Rank::First,
        Color::Black => Rank::Eighth,
    }
}

/// Rank a side's pawns promote on.
pub fn promotion_rank(color: Color) -> Rank {
    home_rank(!color)
}

/// Parse a FEN into a playable position. `None` if shakmaty refuses it.
pub fn parse_position(fen: &str) -> Option<Chess> {
    let fen: Fen = fen.parse().ok()?;
    fen.into_position(CastlingMode::Standard).ok()
}

/// Resolve a client move string against a position. Accepts UCI ("e2e4",
/// "e7e8q") or SAN ("Nf3", "exd5", "O-O", with or without +/#).
pub fn resolve_move(pos: &Chess, notation: &str) -> Option<Move> {
    let notation = notation.trim();
    if let Ok(uci) = notation.parse::<UciMove>() {
        if let Ok(m) = uci.to_move(pos) {
            return Some(m);
        }
    }
    let san: SanPlus = notation.parse().ok()?;
    san.san.to_move(pos).ok()
}

/// UCI text for a move (standard castling notation, e.g. "e1g1").
pub fn move_uci(m: &Move) -> String {
    m.to_uci(CastlingMode::Standard).to_string()
}

/// Square the moving piece lands on. For castling this is the king's
/// destination, not the rook's square.
pub fn destination(m: &Move) -> Square {
    match m {
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() { File::G } else { File::C };
            Square::from_coords(file, king.rank())
        }
        _ => m.to(),
    }
}

/// SAN text for a legal move in `pos`.
pub fn move_san(pos: &Chess, m: &Move) -> String {
    San::from_move(pos, m.clone()).to_string()
}

/// Convert a single UCI move to SAN at a given position.
pub fn uci_to_san(pos: &Chess, uci: &str) -> Option<String> {
    let uci_move: UciMove = uci.parse().ok()?;
    let legal_move = uci_move.to_move(pos).ok()?;
    Some(move_san(pos, &legal_move))
}

/// One step of a replayed engine line.
#[derive(Debug, Clone)]
pub struct LineStep {
    pub mover: Color,
    pub mv: Move,
    /// Value of the piece removed by this move, 0 for quiet moves
    pub captured_value: i32,
    /// Square the captured piece stood on
    pub captured_on: Option<Square>,
}

/// Replay up to `max_plies` UCI moves from `start`, stopping at the first move
/// that is unparsable or illegal.
pub fn replay_line(start: &Chess, ucis: &[String], max_plies: usize) -> Vec<LineStep> {
    let mut pos = start.clone();
    let mut steps = Vec::new();

    for uci in ucis.iter().take(max_plies) {
        let mv = match uci.parse::<UciMove>().ok().and_then(|u| u.to_move(&pos).ok()) {
            Some(m) => m,
            None => break,
        };

        let (captured_value, captured_on) = match &mv {
            Move::EnPassant { from, to } => {
                (PAWN_VALUE, Some(Square::from_coords(to.file(), from.rank())))
            }
            Move::Normal { capture: Some(role), to, .. } => (piece_value(*role), Some(*to)),
            _ => (0, None),
        };

        steps.push(LineStep {
            mover: pos.turn(),
            mv: mv.clone(),
            captured_value,
            captured_on,
        });
        pos.play_unchecked(mv);
    }

    steps
}
