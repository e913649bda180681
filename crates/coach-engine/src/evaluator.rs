//! Evaluator bridge: one engine, at most one live request, newest wins.
//!
//! Every call to [`EvaluatorBridge::evaluate`] takes a fresh generation
//! number. An in-flight search whose generation is no longer current is
//! abandoned: the engine is told to stop, resynchronised, and the caller gets
//! `Ok(None)`. A search that outlives the timeout is abandoned the same way
//! and reported as [`CoachError::EvaluationTimeout`]. The search is cut short
//! of the deadline so that stopping the engine fits inside the timeout too.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chess_core::Position;
use tokio::sync::{watch, Mutex};
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::error::CoachError;
use crate::evaluation::{EngineReport, Evaluation, SearchBudget};

/// Time an abandoned engine gets to acknowledge `stop` before it is discarded.
const HALT_TIMEOUT: Duration = Duration::from_secs(1);

/// Share of the evaluation timeout kept back for stopping a late search,
/// capped at `HALT_TIMEOUT`.
const HALT_SHARE: u32 = 5;

/// A UCI-speaking analysis engine.
#[async_trait]
pub trait Engine: Send {
    /// Search `fen` within `budget`. Scores are relative to the side to move.
    async fn analyse(&mut self, fen: &str, budget: SearchBudget) -> Result<EngineReport, CoachError>;

    /// Stop any running search and wait until the engine is idle again.
    async fn halt(&mut self) -> Result<(), CoachError>;
}

/// Produces engines; called lazily and again after an engine dies.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Engine>, CoachError>;
}

enum Race {
    Finished(Result<EngineReport, CoachError>),
    Superseded,
    TimedOut,
}

pub struct EvaluatorBridge {
    launcher: Arc<dyn EngineLauncher>,
    slot: Mutex<Option<Box<dyn Engine>>>,
    generation: watch::Sender<u64>,
    timeout: Duration,
}

impl EvaluatorBridge {
    pub fn new(launcher: Arc<dyn EngineLauncher>, timeout: Duration) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            launcher,
            slot: Mutex::new(None),
            generation,
            timeout,
        }
    }

    /// Evaluate for live coaching. `Ok(None)` means a newer request replaced
    /// this one before it finished.
    pub async fn evaluate(
        &self,
        position: &Position,
        budget: SearchBudget,
    ) -> Result<Option<Evaluation>, CoachError> {
        let generation = self.advance();
        self.run(position, budget, Some(generation)).await
    }

    /// One-off evaluation that never supersedes live requests (chat).
    pub async fn consult(
        &self,
        position: &Position,
        budget: SearchBudget,
    ) -> Result<Evaluation, CoachError> {
        self.run(position, budget, None)
            .await?
            .ok_or_else(|| CoachError::Engine("consultation was cancelled".into()))
    }

    /// Abandon whatever live request is in flight.
    pub fn cancel_pending(&self) {
        self.advance();
    }

    fn advance(&self) -> u64 {
        let mut next = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            next = *g;
        });
        next
    }

    async fn run(
        &self,
        position: &Position,
        budget: SearchBudget,
        generation: Option<u64>,
    ) -> Result<Option<Evaluation>, CoachError> {
        let deadline = Instant::now() + self.timeout;
        let search_deadline = deadline - (self.timeout / HALT_SHARE).min(HALT_TIMEOUT);
        let mut watcher = self.generation.subscribe();

        let mut slot = tokio::select! {
            guard = timeout_at(deadline, self.slot.lock()) => match guard {
                Ok(guard) => guard,
                Err(_) => return Err(CoachError::EvaluationTimeout(self.timeout)),
            },
            _ = superseded(&mut watcher, generation) => {
                debug!(ply = position.ply, "evaluation superseded while queued");
                return Ok(None);
            }
        };

        if slot.is_none() {
            let engine = match timeout_at(deadline, self.launcher.launch()).await {
                Ok(Ok(engine)) => engine,
                Ok(Err(e)) => {
                    warn!(error = %e, "engine launch failed");
                    return Err(CoachError::EvaluatorUnavailable(e.to_string()));
                }
                Err(_) => {
                    warn!("engine did not start before the deadline");
                    return Err(CoachError::EvaluatorUnavailable(
                        "engine did not start in time".into(),
                    ));
                }
            };
            *slot = Some(engine);
        }
        let Some(engine) = slot.as_mut() else {
            return Err(CoachError::EvaluatorUnavailable("no engine".into()));
        };

        let race = tokio::select! {
            result = engine.analyse(&position.fen, budget) => Race::Finished(result),
            _ = superseded(&mut watcher, generation) => Race::Superseded,
            _ = sleep_until(search_deadline) => Race::TimedOut,
        };

        match race {
            Race::Finished(Ok(report)) => {
                if generation.is_some_and(|g| *watcher.borrow() != g) {
                    debug!(ply = position.ply, "discarding stale evaluation");
                    return Ok(None);
                }
                Evaluation::from_report(position, report).map(Some)
            }
            Race::Finished(Err(e)) => {
                warn!(error = %e, "engine failed, will relaunch on next request");
                *slot = None;
                Err(CoachError::EvaluatorUnavailable(e.to_string()))
            }
            Race::Superseded => {
                debug!(ply = position.ply, "evaluation superseded");
                release(&mut slot, Instant::now() + HALT_TIMEOUT).await;
                Ok(None)
            }
            Race::TimedOut => {
                info!(ply = position.ply, timeout_ms = self.timeout.as_millis() as u64, "evaluation timed out");
                release(&mut slot, deadline).await;
                Err(CoachError::EvaluationTimeout(self.timeout))
            }
        }
    }
}

/// Resolves once `generation` is no longer current. Never resolves for `None`.
async fn superseded(watcher: &mut watch::Receiver<u64>, generation: Option<u64>) {
    let Some(generation) = generation else {
        return std::future::pending().await;
    };
    if watcher.wait_for(|current| *current != generation).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Bring an abandoned engine back to idle before `until`, or discard it.
async fn release(slot: &mut Option<Box<dyn Engine>>, until: Instant) {
    let Some(engine) = slot.as_mut() else {
        return;
    };
    match timeout_at(until, engine.halt()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(error = %e, "engine failed to halt, discarding it");
            *slot = None;
        }
        Err(_) => {
            warn!("engine ignored stop, discarding it");
            *slot = None;
        }
    }
}
