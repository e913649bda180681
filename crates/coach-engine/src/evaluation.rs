//! Engine scores and their normalization to White's point of view.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chess_core::Position;
use shakmaty::Color;

use crate::error::CoachError;

/// Scalar stand-in for a forced mate; shorter mates score higher.
pub const MATE_SCORE: i32 = 10_000;

/// Search limit passed to the engine's `go` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBudget {
    Depth(u32),
    Nodes(u32),
    MoveTime(Duration),
}

impl SearchBudget {
    pub fn go_command(&self) -> String {
        match self {
            SearchBudget::Depth(d) => format!("go depth {d}"),
            SearchBudget::Nodes(n) => format!("go nodes {n}"),
            SearchBudget::MoveTime(t) => format!("go movetime {}", t.as_millis()),
        }
    }
}

impl FromStr for SearchBudget {
    type Err = CoachError;

    /// `movetime:500`, `depth:12` or `nodes:100000`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoachError::Config(format!("invalid search budget '{s}'"));
        let (kind, value) = s.trim().split_once(':').ok_or_else(invalid)?;
        let value: u32 = value.trim().parse().map_err(|_| invalid())?;
        if value == 0 {
            return Err(invalid());
        }
        match kind.trim() {
            "depth" => Ok(SearchBudget::Depth(value)),
            "nodes" => Ok(SearchBudget::Nodes(value)),
            "movetime" => Ok(SearchBudget::MoveTime(Duration::from_millis(value as u64))),
            _ => Err(invalid()),
        }
    }
}

/// Score as the engine reports it, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawScore {
    Cp(i32),
    /// Mate in N (positive = side to move mates, 0 or negative = side to move is mated)
    Mate(i32),
}

/// One engine answer, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineReport {
    pub best_move: Option<String>,
    pub score: Option<RawScore>,
    pub pv: Vec<String>,
}

/// Score from White's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Cp(i32),
    Mate { winner: Color, moves: u32 },
}

impl Score {
    pub fn from_relative(raw: RawScore, side_to_move: Color) -> Self {
        match raw {
            RawScore::Cp(cp) => Score::Cp(match side_to_move {
                Color::White => cp,
                Color::Black => -cp,
            }),
            RawScore::Mate(m) if m > 0 => Score::Mate {
                winner: side_to_move,
                moves: m as u32,
            },
            RawScore::Mate(m) => Score::Mate {
                winner: !side_to_move,
                moves: m.unsigned_abs(),
            },
        }
    }

    /// Centipawn-like scalar from `color`'s point of view.
    pub fn for_side(&self, color: Color) -> i32 {
        match *self {
            Score::Cp(cp) => match color {
                Color::White => cp,
                Color::Black => -cp,
            },
            Score::Mate { winner, moves } => {
                let magnitude = MATE_SCORE - (moves.min(900) as i32) * 10;
                if winner == color {
                    magnitude
                } else {
                    -magnitude
                }
            }
        }
    }

    pub fn mate_winner(&self) -> Option<Color> {
        match *self {
            Score::Mate { winner, .. } => Some(winner),
            Score::Cp(_) => None,
        }
    }

    /// The same assessment seen from the other side of the board.
    pub fn flipped(&self) -> Self {
        match *self {
            Score::Cp(cp) => Score::Cp(-cp),
            Score::Mate { winner, moves } => Score::Mate {
                winner: !winner,
                moves,
            },
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Score::Cp(cp) => write!(f, "{:+.2}", cp as f64 / 100.0),
            Score::Mate { winner: Color::White, moves } => write!(f, "+M{moves}"),
            Score::Mate { winner: Color::Black, moves } => write!(f, "-M{moves}"),
        }
    }
}

/// Normalized evaluation bound to the FEN it was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub fen: String,
    pub score: Score,
    /// Engine's choice in this position, UCI
    pub best_move: Option<String>,
    /// Principal variation, UCI, starting with the side to move
    pub pv: Vec<String>,
}

impl Evaluation {
    pub fn from_report(position: &Position, report: EngineReport) -> Result<Self, CoachError> {
        let raw = report
            .score
            .ok_or_else(|| CoachError::Engine("engine reported no score".into()))?;
        Ok(Self {
            fen: position.fen.clone(),
            score: Score::from_relative(raw, position.side_to_move),
            best_move: report.best_move,
            pv: report.pv,
        })
    }
}
