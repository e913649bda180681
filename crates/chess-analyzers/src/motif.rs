use serde::{Deserialize, Serialize};
use shakmaty::Square;

use crate::MOTIF_TAGS;

/// Motif kinds, declared in dominance order: when several co-occur on one ply
/// the first one in this list leads the commentary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotifKind {
    BackRankThreat,
    Check,
    Promotion,
    Fork,
    Capture,
    HangingPiece,
}

impl MotifKind {
    pub fn name(self) -> &'static str {
        match self {
            MotifKind::BackRankThreat => "back_rank_threat",
            MotifKind::Check => "check",
            MotifKind::Promotion => "promotion",
            MotifKind::Fork => "fork",
            MotifKind::Capture => "capture",
            MotifKind::HangingPiece => "hanging_piece",
        }
    }

    pub fn label(self) -> &'static str {
        let name = self.name();
        MOTIF_TAGS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, label)| *label)
            .unwrap_or(name)
    }
}

/// A structural finding on one ply, with the squares it concerns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Motif {
    pub kind: MotifKind,
    pub squares: Vec<Square>,
}

impl Motif {
    pub fn new(kind: MotifKind, squares: Vec<Square>) -> Self {
        Self { kind, squares }
    }

    /// The square the motif is anchored on (first listed).
    pub fn anchor(&self) -> Option<Square> {
        self.squares.first().copied()
    }
}

/// The motif that should lead commentary for a ply.
pub fn dominant(motifs: &[Motif]) -> Option<&Motif> {
    motifs.iter().min_by_key(|m| m.kind)
}
