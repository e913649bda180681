//! Live game coaching: evaluation, classification, tips, broadcast and
//! end-of-game review on top of a UCI engine.

pub mod chat;
pub mod classify;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod evaluator;
pub mod hub;
pub mod ledger;
pub mod review;
pub mod session;
pub mod stockfish;
pub mod tips;

pub use classify::{Classification, Thresholds};
pub use config::CoachConfig;
pub use error::CoachError;
pub use evaluation::{EngineReport, Evaluation, RawScore, Score, SearchBudget};
pub use evaluator::{Engine, EngineLauncher, EvaluatorBridge};
pub use hub::{BroadcastHub, PushMessage, Subscription};
pub use review::{DrillCandidate, PlyRecord, ReviewReport};
pub use session::{
    ChallengeReply, ChatReply, ChatRequest, CoachService, SessionStatus, SyncOutcome, SyncRequest,
    SyncStatus,
};
pub use tips::{ChallengeOutcome, CoachingTip, Emphasis, HotSquare};
