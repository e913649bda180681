//! Move classification: pure functions only
//! (No Board/Engine/Session dependencies)

use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::error::CoachError;
use crate::evaluation::Score;

/// Per-move loss cap used when averaging for accuracy
const MAX_CP_LOSS: i32 = 500;

/// Verdict on a move, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Best,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Best => "best",
            Classification::Good => "good",
            Classification::Inaccuracy => "inaccuracy",
            Classification::Mistake => "mistake",
            Classification::Blunder => "blunder",
        }
    }

    /// Best or Good.
    pub fn is_sound(&self) -> bool {
        *self <= Classification::Good
    }

    /// Mistake or Blunder.
    pub fn is_severe(&self) -> bool {
        *self >= Classification::Mistake
    }
}

/// Centipawn-loss cutpoints. A loss at or above a cutpoint earns that class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Below this, a move with no best-move comparison counts as Best
    pub best: i32,
    pub inaccuracy: i32,
    pub mistake: i32,
    pub blunder: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            best: 10,
            inaccuracy: 50,
            mistake: 100,
            blunder: 300,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), CoachError> {
        if self.best < 0 {
            return Err(CoachError::Config("best threshold must not be negative".into()));
        }
        if !(self.best < self.inaccuracy
            && self.inaccuracy < self.mistake
            && self.mistake < self.blunder)
        {
            return Err(CoachError::Config(format!(
                "classification thresholds must ascend, got {}/{}/{}/{}",
                self.best, self.inaccuracy, self.mistake, self.blunder
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub classification: Classification,
    /// Evaluation the mover gave up, never negative
    pub loss: i32,
}

/// Evaluation lost by `mover` between the two scores.
pub fn centipawn_loss(before: &Score, after: &Score, mover: Color) -> i32 {
    if let (Some(a), Some(b)) = (before.mate_winner(), after.mate_winner()) {
        if a == b {
            return 0;
        }
    }
    (before.for_side(mover) - after.for_side(mover)).max(0)
}

/// Loss-only classification. `matched_best` splits the sub-inaccuracy band
/// when the engine's preferred move is known.
pub fn classify_loss(loss: i32, thresholds: &Thresholds, matched_best: Option<bool>) -> Classification {
    if loss >= thresholds.blunder {
        Classification::Blunder
    } else if loss >= thresholds.mistake {
        Classification::Mistake
    } else if loss >= thresholds.inaccuracy {
        Classification::Inaccuracy
    } else {
        match matched_best {
            Some(true) => Classification::Best,
            Some(false) => Classification::Good,
            None if loss < thresholds.best => Classification::Best,
            None => Classification::Good,
        }
    }
}

/// Classify a move from the evaluations before and after it.
pub fn classify(
    before: &Score,
    after: &Score,
    mover: Color,
    thresholds: &Thresholds,
    matched_best: Option<bool>,
) -> Verdict {
    let loss = centipawn_loss(before, after, mover);
    let mut classification = classify_loss(loss, thresholds, matched_best);

    let had_mate = before.mate_winner() == Some(mover);
    let keeps_mate = after.mate_winner() == Some(mover);
    if had_mate && !keeps_mate {
        classification = Classification::Blunder;
    }

    let was_mated = before.mate_winner() == Some(!mover);
    let gets_mated = after.mate_winner() == Some(!mover);
    if !was_mated && gets_mated {
        classification = classification.max(Classification::Mistake);
    }

    Verdict {
        classification,
        loss,
    }
}

/// Average-loss accuracy in percent.
pub fn calculate_accuracy(losses: &[i32]) -> f64 {
    if losses.is_empty() {
        return 100.0;
    }
    let total: i32 = losses.iter().map(|l| (*l).clamp(0, MAX_CP_LOSS)).sum();
    let acpl = total as f64 / losses.len() as f64;
    let accuracy = 100.0 * (1.0 / (1.0 + acpl / 100.0)).sqrt();
    accuracy.clamp(0.0, 100.0)
}
