//! Tip synthesis: classification + motifs + evaluation -> one coaching tip.
//!
//! Everything here is a pure function of its arguments.

use chess_analyzers::board::{parse_position, replay_line};
use chess_analyzers::motif::dominant;
use chess_analyzers::{Motif, MotifKind};
use chess_core::{color_title, Position};
use serde::Serialize;
use shakmaty::{Color, Square};

use crate::classify::Classification;
use crate::evaluation::Evaluation;

/// Plies of the principal variation scanned for the opponent's biggest capture.
const PV_SCAN_PLIES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Gold,
    Red,
    Blue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotSquare {
    pub square: String,
    #[serde(rename = "type")]
    pub kind: Emphasis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Challenge {
    pub target_square: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoachingTip {
    pub message: String,
    pub hot_squares: Vec<HotSquare>,
    pub challenge: Option<Challenge>,
}

/// The move being commented on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedMove {
    pub san: String,
    pub uci: String,
    pub to: Square,
}

/// Board facts for one ply.
#[derive(Debug, Clone, Copy)]
pub struct PlyFacts<'a> {
    /// Position after the move
    pub position: &'a Position,
    pub mover: Color,
    pub played: Option<&'a PlayedMove>,
    /// Engine's preferred move in the position before, SAN
    pub better_move: Option<&'a str>,
}

/// The opponent's best answer, read from the after-move principal variation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Refutation {
    target: Square,
    /// Square of the most valuable piece the opponent wins in the line
    swing: Option<Square>,
}

impl Refutation {
    fn read(position: &Position, evaluation: &Evaluation, mover: Color) -> Option<Self> {
        if evaluation.fen != position.fen {
            return None;
        }
        let pos = parse_position(&position.fen)?;
        let steps = replay_line(&pos, &evaluation.pv, PV_SCAN_PLIES);
        let first = steps.first().filter(|s| s.mover != mover)?;

        let mut swing: Option<(i32, Square)> = None;
        for step in steps.iter().filter(|s| s.mover != mover) {
            if let Some(on) = step.captured_on {
                if swing.map_or(true, |(value, _)| step.captured_value > value) {
                    swing = Some((step.captured_value, on));
                }
            }
        }

        Some(Self {
            target: first.mv.to(),
            swing: swing.map(|(_, sq)| sq),
        })
    }
}

/// Build the tip for one ply, or `None` when there is nothing to say.
pub fn synthesize(
    classification: Option<Classification>,
    motifs: &[Motif],
    evaluation: Option<&Evaluation>,
    facts: &PlyFacts,
) -> Option<CoachingTip> {
    let lead = dominant(motifs);
    if classification.is_none() && lead.is_none() {
        return None;
    }

    let refutation = evaluation.and_then(|e| Refutation::read(facts.position, e, facts.mover));
    let message = compose_message(classification, lead, facts);
    let hot_squares = highlight(classification, lead, facts, refutation.as_ref());

    let challenge = match (classification, &refutation) {
        (Some(c), Some(r)) if c.is_severe() => Some(Challenge {
            target_square: r.target.to_string(),
            prompt: format!(
                "{} has a strong reply here. Which square does it land on?",
                color_title(!facts.mover)
            ),
        }),
        _ => None,
    };

    Some(CoachingTip {
        message,
        hot_squares,
        challenge,
    })
}

fn compose_message(classification: Option<Classification>, lead: Option<&Motif>, facts: &PlyFacts) -> String {
    use Classification::*;
    use MotifKind::*;

    let side = color_title(facts.mover);
    let opp = color_title(!facts.mover);
    let played = facts.played.map_or("That move", |p| p.san.as_str());
    let sq = lead
        .and_then(Motif::anchor)
        .map_or_else(String::new, |s| s.to_string());

    let mut text = match (classification, lead.map(|m| m.kind)) {
        (Some(Blunder), Some(HangingPiece)) => {
            format!("Blunder. The piece on {sq} is left hanging and {opp} can take it.")
        }
        (Some(Blunder), Some(Check)) => {
            format!("Blunder. The check looks forcing, but {opp} has a crushing reply.")
        }
        (Some(Blunder), Some(Capture)) => "Blunder. That capture walks into a strong reply.".to_string(),
        (Some(Blunder), _) => format!("Blunder. {played} hands {opp} a winning chance."),
        (Some(Mistake), Some(HangingPiece)) => format!("Mistake. The piece on {sq} has no defender."),
        (Some(Mistake), Some(Capture)) => format!("Mistake. Taking there gives {opp} the better game."),
        (Some(Mistake), _) => format!("Mistake. {played} lets {opp} improve their position."),
        (Some(Inaccuracy), _) => format!("Inaccuracy. {played} is playable, but there was something stronger."),
        (Some(Best), Some(BackRankThreat)) => format!("Best move. {opp}'s back rank is now a real weakness."),
        (Some(Best), Some(Fork)) => "Best move. The knight forks the king and a heavy piece.".to_string(),
        (Some(Best), Some(Check)) => format!("Best move. The check keeps {opp} on the back foot."),
        (Some(Best), Some(Promotion)) => "Best move. Promoting at exactly the right moment.".to_string(),
        (Some(Best), Some(Capture)) => "Best move. A clean capture.".to_string(),
        (Some(Best), _) => format!("Best move. {played} is exactly what the position needed."),
        (Some(Good), Some(Fork)) => "Good move. Nice fork.".to_string(),
        (Some(Good), Some(Capture)) => "Good move. A sound capture.".to_string(),
        (Some(Good), _) => format!("Good move. {played} keeps things under control."),
        (None, Some(BackRankThreat)) => format!("Watch the back rank: {opp}'s king has no escape square."),
        (None, Some(Check)) => format!("Check! {opp} must deal with the threat to the king."),
        (None, Some(Fork)) => format!("Fork! The knight on {sq} attacks several pieces at once."),
        (None, Some(Promotion)) => format!("Promotion on {sq}!"),
        (None, Some(Capture)) => format!("{side} captures on {sq}."),
        (None, Some(HangingPiece)) => format!("Careful: the piece on {sq} is attacked and undefended."),
        (None, None) => String::new(),
    };

    if classification.is_some_and(|c| c >= Inaccuracy) {
        if let Some(better) = facts.better_move {
            if facts.played.map_or(true, |p| p.san != better) {
                text.push_str(&format!(" {better} was stronger."));
            }
        }
    }
    text
}

fn highlight(
    classification: Option<Classification>,
    lead: Option<&Motif>,
    facts: &PlyFacts,
    refutation: Option<&Refutation>,
) -> Vec<HotSquare> {
    let destination = facts.played.map(|p| p.to);
    let primary = match classification {
        Some(Classification::Best | Classification::Good) => destination.map(|s| (s, Emphasis::Gold)),
        Some(Classification::Inaccuracy) => destination.map(|s| (s, Emphasis::Blue)),
        Some(Classification::Mistake) => refutation
            .map(|r| r.target)
            .or(destination)
            .map(|s| (s, Emphasis::Red)),
        Some(Classification::Blunder) => refutation
            .and_then(|r| r.swing.or(Some(r.target)))
            .or(destination)
            .map(|s| (s, Emphasis::Red)),
        None => None,
    };

    let mut squares: Vec<(Square, Emphasis)> = primary.into_iter().collect();
    if let Some(anchor) = lead.and_then(Motif::anchor) {
        if !squares.iter().any(|(s, _)| *s == anchor) {
            squares.push((anchor, Emphasis::Blue));
        }
    }

    squares
        .into_iter()
        .map(|(square, kind)| HotSquare {
            square: square.to_string(),
            kind,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeOutcome {
    Solved,
    Missed,
    NoChallenge,
}

/// Compare a clicked square against the tip's challenge.
pub fn resolve_challenge(tip: Option<&CoachingTip>, answer: &str) -> ChallengeOutcome {
    match tip.and_then(|t| t.challenge.as_ref()) {
        None => ChallengeOutcome::NoChallenge,
        Some(c) if c.target_square.eq_ignore_ascii_case(answer.trim()) => ChallengeOutcome::Solved,
        Some(_) => ChallengeOutcome::Missed,
    }
}

/// Follow-up tip once the challenge is solved; the challenge is cleared.
pub fn confirmation_tip(tip: &CoachingTip) -> Option<CoachingTip> {
    let challenge = tip.challenge.as_ref()?;
    Some(CoachingTip {
        message: format!(
            "Correct! {} is the square to watch. Look for that reply before you commit next time.",
            challenge.target_square
        ),
        hot_squares: vec![HotSquare {
            square: challenge.target_square.clone(),
            kind: Emphasis::Gold,
        }],
        challenge: None,
    })
}
