use shakmaty::Color;

use crate::fen::{parse_fen, FenError, STANDARD_START_FEN};
use crate::pgn;

/// Immutable board snapshot plus the notation accumulated so far.
///
/// A new `Position` is built for every ply; the FEN is trusted to be legal
/// because the upstream rules engine produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub fen: String,
    pub pgn: String,
    /// SAN moves extracted from `pgn`
    pub moves: Vec<String>,
    pub side_to_move: Color,
    /// Plies played from move 1 to reach this position (derived from the FEN counters)
    pub ply: u32,
    /// The move that produced this position, as sent by the client (UCI or SAN)
    pub last_move: Option<String>,
}

impl Position {
    /// The standard initial position with no moves played.
    pub fn starting() -> Self {
        Self {
            fen: STANDARD_START_FEN.to_string(),
            pgn: String::new(),
            moves: Vec::new(),
            side_to_move: Color::White,
            ply: 0,
            last_move: None,
        }
    }

    /// Build a snapshot from a client sync. Only the FEN shape is validated.
    pub fn from_sync(fen: &str, pgn: &str, last_move: Option<&str>) -> Result<Self, FenError> {
        let fields = parse_fen(fen)?;
        let last_move = last_move
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from);

        Ok(Self {
            fen: fen.split_whitespace().collect::<Vec<_>>().join(" "),
            pgn: pgn.to_string(),
            moves: pgn::extract_moves(pgn),
            side_to_move: fields.side_to_move,
            ply: fields.ply(),
            last_move,
        })
    }

    /// Side that played `last_move`.
    pub fn mover(&self) -> Color {
        !self.side_to_move
    }

    /// Result recorded in the PGN by the rules engine, if the game is over.
    pub fn reported_result(&self) -> Option<String> {
        pgn::game_result(&self.pgn)
    }
}
