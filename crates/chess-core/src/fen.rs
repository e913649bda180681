//! FEN shape validation.
//!
//! Checks the six fields and that every rank covers exactly eight files.
//! Whether the position is reachable is not our concern.

use std::sync::LazyLock;

use regex::Regex;
use shakmaty::Color;
use thiserror::Error;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

static CASTLING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-|[KQkqA-Ha-h]{1,4})$").expect("static regex"));

static EN_PASSANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-|[a-h][36])$").expect("static regex"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("expected 6 space-separated fields, found {0}")]
    FieldCount(usize),

    #[error("expected 8 ranks, found {0}")]
    RankCount(usize),

    #[error("rank {rank} covers {files} files instead of 8")]
    RankWidth { rank: usize, files: u32 },

    #[error("invalid placement character '{0}'")]
    PlacementChar(char),

    #[error("invalid side to move '{0}'")]
    SideToMove(String),

    #[error("invalid castling field '{0}'")]
    Castling(String),

    #[error("invalid en passant field '{0}'")]
    EnPassant(String),

    #[error("invalid move counter '{0}'")]
    Counter(String),
}

/// Largest fullmove counter accepted. Keeps ply arithmetic in range.
pub const MAX_FULLMOVE: u32 = 1_000_000;

/// The six FEN fields after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenFields {
    pub placement: String,
    pub side_to_move: Color,
    pub castling: String,
    pub en_passant: Option<String>,
    pub halfmove: u32,
    pub fullmove: u32,
}

impl FenFields {
    /// Number of plies played to reach this position from move 1.
    pub fn ply(&self) -> u32 {
        let base = self.fullmove.saturating_sub(1).saturating_mul(2);
        match self.side_to_move {
            Color::White => base,
            Color::Black => base.saturating_add(1),
        }
    }
}

/// Validate a FEN string and split it into fields.
pub fn parse_fen(fen: &str) -> Result<FenFields, FenError> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(FenError::FieldCount(fields.len()));
    }

    check_placement(fields[0])?;

    let side_to_move = match fields[1] {
        "w" => Color::White,
        "b" => Color::Black,
        other => return Err(FenError::SideToMove(other.to_string())),
    };

    if !CASTLING_RE.is_match(fields[2]) {
        return Err(FenError::Castling(fields[2].to_string()));
    }
    if !EN_PASSANT_RE.is_match(fields[3]) {
        return Err(FenError::EnPassant(fields[3].to_string()));
    }

    let halfmove: u32 = fields[4]
        .parse()
        .map_err(|_| FenError::Counter(fields[4].to_string()))?;
    let fullmove: u32 = fields[5]
        .parse()
        .map_err(|_| FenError::Counter(fields[5].to_string()))?;
    if fullmove == 0 || fullmove > MAX_FULLMOVE {
        return Err(FenError::Counter(fields[5].to_string()));
    }

    Ok(FenFields {
        placement: fields[0].to_string(),
        side_to_move,
        castling: fields[2].to_string(),
        en_passant: (fields[3] != "-").then(|| fields[3].to_string()),
        halfmove,
        fullmove,
    })
}

fn check_placement(placement: &str) -> Result<(), FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::RankCount(ranks.len()));
    }

    for (i, rank) in ranks.iter().enumerate() {
        let mut files = 0u32;
        for c in rank.chars() {
            match c {
                '1'..='8' => files += c.to_digit(10).unwrap_or(0),
                'p' | 'n' | 'b' | 'r' | 'q' | 'k' | 'P' | 'N' | 'B' | 'R' | 'Q' | 'K' => files += 1,
                other => return Err(FenError::PlacementChar(other)),
            }
        }
        if files != 8 {
            // First rank in the string is the eighth rank on the board
            return Err(FenError::RankWidth { rank: 8 - i, files });
        }
    }

    Ok(())
}
