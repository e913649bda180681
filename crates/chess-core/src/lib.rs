//! Board-notation primitives shared by the coaching crates.
//!
//! Nothing in here knows chess rules: FEN strings are checked for shape only,
//! legality is whatever the upstream rules engine certified.

pub mod fen;
pub mod pgn;
pub mod position;

pub use fen::{parse_fen, FenError, FenFields, STANDARD_START_FEN};
pub use position::Position;

use shakmaty::Color;

/// Parse a side name as sent by clients ("white", "w", "Black", ...).
pub fn parse_color(s: &str) -> Option<Color> {
    match s.trim().to_ascii_lowercase().as_str() {
        "w" | "white" => Some(Color::White),
        "b" | "black" => Some(Color::Black),
        _ => None,
    }
}

/// Lowercase wire name for a side.
pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

/// Capitalized name for coaching prose.
pub fn color_title(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}
