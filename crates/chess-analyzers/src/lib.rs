//! Structural motif detection.
//!
//! Each analyzer inspects one played move (board before, move, board after)
//! and reports a motif without consulting any engine. The main entry point is
//! `detect()` which runs all analyzers and returns every motif found.

pub mod analyzer_trait;
pub mod analyzers;
pub mod board;
pub mod motif;
pub mod unified;

pub use motif::{Motif, MotifKind};
pub use unified::{detect, detect_from_fens};

/// Display labels for each motif, by motif name.
pub const MOTIF_TAGS: &[(&str, &str)] = &[
    ("back_rank_threat", "Back Rank Threat"),
    ("check", "Check"),
    ("promotion", "Promotion"),
    ("fork", "Fork"),
    ("capture", "Capture"),
    ("hanging_piece", "Hanging Piece"),
];
