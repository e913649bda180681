//! Coach configuration from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::classify::Thresholds;
use crate::error::CoachError;
use crate::evaluation::SearchBudget;

#[derive(Clone, Debug)]
pub struct CoachConfig {
    /// Path to Stockfish binary
    pub stockfish_path: String,

    pub engine_threads: u32,

    pub engine_hash_mb: u32,

    /// Hard limit on a single evaluation, including engine startup
    pub eval_timeout: Duration,

    /// Search limit for live coaching
    pub eval_budget: SearchBudget,

    /// Search limit for chat questions
    pub chat_budget: SearchBudget,

    /// Per-subscriber push backlog
    pub hub_buffer: usize,

    pub thresholds: Thresholds,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            stockfish_path: "stockfish".to_string(),
            engine_threads: 1,
            engine_hash_mb: 64,
            eval_timeout: Duration::from_millis(3000),
            eval_budget: SearchBudget::MoveTime(Duration::from_millis(500)),
            chat_budget: SearchBudget::MoveTime(Duration::from_millis(300)),
            hub_buffer: 32,
            thresholds: Thresholds::default(),
        }
    }
}

impl CoachConfig {
    /// Load configuration from environment variables. Unset or unparsable
    /// numbers fall back to defaults; bad budgets and thresholds are errors.
    pub fn from_env() -> Result<Self, CoachError> {
        let defaults = Self::default();

        let stockfish_path = env::var("STOCKFISH_PATH").unwrap_or(defaults.stockfish_path);

        let eval_budget = match env::var("EVAL_BUDGET") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.eval_budget,
        };
        let chat_budget = match env::var("CHAT_BUDGET") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.chat_budget,
        };

        let thresholds = Thresholds {
            best: env_or("CLASSIFY_BEST_CP", defaults.thresholds.best),
            inaccuracy: env_or("CLASSIFY_INACCURACY_CP", defaults.thresholds.inaccuracy),
            mistake: env_or("CLASSIFY_MISTAKE_CP", defaults.thresholds.mistake),
            blunder: env_or("CLASSIFY_BLUNDER_CP", defaults.thresholds.blunder),
        };
        thresholds.validate()?;

        Ok(Self {
            stockfish_path,
            engine_threads: env_or("ENGINE_THREADS", defaults.engine_threads),
            engine_hash_mb: env_or("ENGINE_HASH_MB", defaults.engine_hash_mb),
            eval_timeout: Duration::from_millis(env_or("EVAL_TIMEOUT_MS", 3000)),
            eval_budget,
            chat_budget,
            hub_buffer: env_or("HUB_BUFFER", defaults.hub_buffer),
            thresholds,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
