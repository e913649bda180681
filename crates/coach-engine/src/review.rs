//! End-of-game review over the classification log.

use std::collections::BTreeMap;

use chess_analyzers::board::{parse_position, uci_to_san};
use chess_analyzers::MotifKind;
use chess_core::color_title;
use serde::Serialize;
use shakmaty::Color;

use crate::classify::{calculate_accuracy, Classification};

/// Shortest run of Best/Good moves worth a lesson.
const MIN_STREAK: usize = 3;

/// One played move as it was scored. Unscored plies carry no classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyRecord {
    /// Ply of the position after the move
    pub ply: u32,
    pub mover: Color,
    pub fen_before: String,
    /// UCI
    pub played_move: String,
    pub played_san: String,
    /// Engine's choice in `fen_before`, UCI
    pub best_move: Option<String>,
    pub classification: Option<Classification>,
    pub loss: i32,
    /// Dominant motif first
    pub motifs: Vec<MotifKind>,
}

/// The position to replay after the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrillCandidate {
    #[serde(skip)]
    pub ply: u32,
    pub fen: String,
    pub played_move: String,
    pub best_move: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewReport {
    pub lessons: Vec<String>,
    pub blunder: Option<DrillCandidate>,
}

/// The Blunder that lost the most; earliest ply on ties.
pub fn select_drill(log: &[PlyRecord]) -> Option<DrillCandidate> {
    log.iter()
        .filter(|r| r.classification == Some(Classification::Blunder))
        .min_by_key(|r| (std::cmp::Reverse(r.loss), r.ply))
        .map(|r| DrillCandidate {
            ply: r.ply,
            fen: r.fen_before.clone(),
            played_move: r.played_move.clone(),
            best_move: r.best_move.clone().unwrap_or_default(),
        })
}

pub fn review(log: &[PlyRecord]) -> ReviewReport {
    let blunder = select_drill(log);
    let mut lessons = Vec::new();

    if let Some(drill) = &blunder {
        if let Some(record) = log.iter().find(|r| r.ply == drill.ply) {
            lessons.push(blunder_lesson(record));
        }
    }
    lessons.extend(inaccuracy_lessons(log));
    if let Some(lesson) = streak_lesson(log) {
        lessons.push(lesson);
    }
    lessons.extend(summary_lessons(log));

    ReviewReport { lessons, blunder }
}

fn blunder_lesson(record: &PlyRecord) -> String {
    let mut text = format!(
        "Biggest slip: {} played {} at ply {} and gave up {:.1} pawns.",
        color_title(record.mover),
        record.played_san,
        record.ply,
        record.loss as f64 / 100.0
    );
    if let Some(uci) = &record.best_move {
        let best = parse_position(&record.fen_before)
            .and_then(|pos| uci_to_san(&pos, uci))
            .unwrap_or_else(|| uci.clone());
        text.push_str(&format!(" {best} was the move. Try it again in the drill."));
    }
    text
}

fn inaccuracy_lessons(log: &[PlyRecord]) -> Vec<String> {
    let mut by_motif: BTreeMap<Option<MotifKind>, usize> = BTreeMap::new();
    for record in log
        .iter()
        .filter(|r| r.classification == Some(Classification::Inaccuracy))
    {
        *by_motif.entry(record.motifs.first().copied()).or_default() += 1;
    }

    by_motif
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(motif, count)| match motif {
            Some(MotifKind::Capture) => {
                format!("{count} inaccuracies came with captures. Check what the recapture allows before trading.")
            }
            Some(MotifKind::Check) => {
                format!("{count} inaccuracies were checks. A check is only good if it improves your position.")
            }
            Some(kind) => format!(
                "{count} inaccuracies involved {}. Slow down when that pattern is on the board.",
                kind.label().to_lowercase()
            ),
            None => format!("{count} inaccuracies came in quiet positions. Look for a plan before moving."),
        })
        .collect()
}

fn streak_lesson(log: &[PlyRecord]) -> Option<String> {
    // (color, length, first ply, last ply)
    let mut longest: Option<(Color, usize, u32, u32)> = None;

    for color in [Color::White, Color::Black] {
        let mut run: Option<(usize, u32, u32)> = None;
        for record in log.iter().filter(|r| r.mover == color) {
            if record.classification.is_some_and(|c| c.is_sound()) {
                run = Some(match run {
                    Some((len, first, _)) => (len + 1, first, record.ply),
                    None => (1, record.ply, record.ply),
                });
                if let Some((len, first, last)) = run {
                    if longest.map_or(true, |(_, best, _, _)| len > best) {
                        longest = Some((color, len, first, last));
                    }
                }
            } else {
                run = None;
            }
        }
    }

    let (color, len, first, last) = longest.filter(|(_, len, _, _)| *len >= MIN_STREAK)?;
    Some(format!(
        "Best stretch: {} played {len} strong moves in a row, from ply {first} to ply {last}.",
        color_title(color)
    ))
}

fn summary_lessons(log: &[PlyRecord]) -> Vec<String> {
    let mut lines = Vec::new();
    for color in [Color::White, Color::Black] {
        let scored: Vec<&PlyRecord> = log
            .iter()
            .filter(|r| r.mover == color && r.classification.is_some())
            .collect();
        if scored.is_empty() {
            continue;
        }
        let losses: Vec<i32> = scored.iter().map(|r| r.loss).collect();
        let count = |c: Classification| scored.iter().filter(|r| r.classification == Some(c)).count();
        lines.push(format!(
            "{}: {} scored moves, accuracy {:.0}%, {} inaccuracies, {} mistakes, {} blunders.",
            color_title(color),
            scored.len(),
            calculate_accuracy(&losses),
            count(Classification::Inaccuracy),
            count(Classification::Mistake),
            count(Classification::Blunder)
        ));
    }
    lines
}
