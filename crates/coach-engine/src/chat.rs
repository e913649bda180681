//! Read-only question answering about the current position.

use std::collections::VecDeque;

use chess_analyzers::board::{parse_position, uci_to_san};
use chess_core::{color_title, Position};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shakmaty::Color;

use crate::evaluation::{Evaluation, Score};
use crate::review::PlyRecord;

/// Advisories kept per session; oldest are dropped first.
pub const ADVISORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    BestMove,
    LastMove,
    Evaluation,
    General,
}

pub fn intent(question: &str) -> Intent {
    let q = question.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| q.contains(w));

    if has(&["best move", "what should", "which move", "suggest", "what move"]) {
        Intent::BestMove
    } else if has(&["last move", "my move", "mistake", "blunder", "was that", "why"]) {
        Intent::LastMove
    } else if has(&["eval", "winning", "better", "advantage", "score", "who is"]) {
        Intent::Evaluation
    } else {
        Intent::General
    }
}

/// Plain-language verdict on a White-perspective score.
pub fn balance_phrase(score: &Score) -> String {
    if let Score::Mate { winner, moves } = *score {
        return if moves == 0 {
            format!("{} has delivered checkmate.", color_title(winner))
        } else {
            format!("{} has a forced mate in {moves}.", color_title(winner))
        };
    }
    let cp = score.for_side(Color::White);
    if cp > 150 {
        "White has a significant advantage.".to_string()
    } else if cp > 50 {
        "White is slightly better.".to_string()
    } else if cp < -150 {
        "Black has a significant advantage.".to_string()
    } else if cp < -50 {
        "Black is slightly better.".to_string()
    } else {
        "The position is balanced.".to_string()
    }
}

/// Everything an answer may draw on.
#[derive(Debug, Clone, Copy)]
pub struct ChatContext<'a> {
    pub position: &'a Position,
    pub evaluation: Option<&'a Evaluation>,
    pub last: Option<&'a PlyRecord>,
    pub player: Option<Color>,
}

pub fn answer(question: &str, ctx: &ChatContext) -> String {
    let to_move = ctx.position.side_to_move;
    let mut parts: Vec<String> = Vec::new();

    match intent(question) {
        Intent::BestMove => match suggested_move(ctx) {
            Some(san) => {
                parts.push(format!("The engine suggests {san} for {}.", color_title(to_move)));
                if ctx.player.is_some_and(|p| p != to_move) {
                    parts.push("It is your opponent's turn, so be ready for that reply.".to_string());
                }
            }
            None => parts.push("I can't name a best move right now.".to_string()),
        },
        Intent::LastMove => parts.push(describe_last(ctx.last)),
        Intent::Evaluation | Intent::General => {
            parts.push(format!("{} to move.", color_title(to_move)));
        }
    }

    match ctx.evaluation {
        Some(eval) => {
            parts.push(format!("Evaluation: {}.", eval.score));
            let mut balance = balance_phrase(&eval.score);
            if let Some(player) = ctx.player {
                if leader(&eval.score) == Some(player) {
                    balance.push_str(" That's you.");
                }
            }
            parts.push(balance);
        }
        None => parts.push(
            "The engine is unavailable right now, so this is based on the board alone.".to_string(),
        ),
    }

    parts.join(" ")
}

fn suggested_move(ctx: &ChatContext) -> Option<String> {
    let eval = ctx.evaluation?;
    let uci = eval.best_move.as_deref()?;
    let pos = parse_position(&ctx.position.fen)?;
    Some(uci_to_san(&pos, uci).unwrap_or_else(|| uci.to_string()))
}

fn describe_last(last: Option<&PlyRecord>) -> String {
    let Some(record) = last else {
        return "No move has been scored yet.".to_string();
    };
    match record.classification {
        Some(c) if c.is_sound() => format!("{} was a {} move.", record.played_san, c.as_str()),
        Some(c) => format!(
            "{} was {} {}, costing about {:.1} pawns.",
            record.played_san,
            if c == crate::classify::Classification::Inaccuracy { "an" } else { "a" },
            c.as_str(),
            record.loss as f64 / 100.0
        ),
        None => format!("{} could not be scored.", record.played_san),
    }
}

/// Side ahead by more than a slight edge.
fn leader(score: &Score) -> Option<Color> {
    match score.mate_winner() {
        Some(winner) => Some(winner),
        None => {
            let cp = score.for_side(Color::White);
            if cp > 50 {
                Some(Color::White)
            } else if cp < -50 {
                Some(Color::Black)
            } else {
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub question: String,
    pub answer: String,
    pub fen: String,
    pub asked_at: DateTime<Utc>,
}

/// Capped record of chat answers.
#[derive(Debug, Default)]
pub struct AdvisoryLog {
    entries: VecDeque<Advisory>,
}

impl AdvisoryLog {
    pub fn push(&mut self, advisory: Advisory) {
        if self.entries.len() == ADVISORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(advisory);
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn latest(&self) -> Option<&Advisory> {
        self.entries.back()
    }
}
