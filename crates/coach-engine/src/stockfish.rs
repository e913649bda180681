//! Stockfish engine wrapper using UCI protocol (async I/O)

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use tracing::{debug, info};

use crate::error::CoachError;
use crate::evaluation::{EngineReport, RawScore, SearchBudget};
use crate::evaluator::{Engine, EngineLauncher};

/// Stockfish engine instance
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(path: &str, threads: u32, hash_mb: u32) -> Result<Self, CoachError> {
        let mut process = Command::new(path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| {
                CoachError::EvaluatorUnavailable(format!("Failed to spawn Stockfish: {e}"))
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| CoachError::EvaluatorUnavailable("Stockfish stdin not piped".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| CoachError::EvaluatorUnavailable("Stockfish stdout not piped".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
        };

        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        engine
            .send(&format!("setoption name Threads value {threads}"))
            .await?;
        engine
            .send(&format!("setoption name Hash value {hash_mb}"))
            .await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.send("ucinewgame").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), CoachError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| CoachError::Engine(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| CoachError::Engine(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Read one line; EOF means the process died.
    async fn read_line(&mut self, line: &mut String) -> Result<(), CoachError> {
        line.clear();
        let n = self
            .stdout
            .read_line(line)
            .await
            .map_err(|e| CoachError::Engine(format!("Failed to read from Stockfish: {e}")))?;
        if n == 0 {
            return Err(CoachError::Engine("Stockfish closed its output".into()));
        }
        Ok(())
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), CoachError> {
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();
            debug!(line = trimmed, "SF >");
            if trimmed == expected {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl Engine for StockfishEngine {
    async fn analyse(&mut self, fen: &str, budget: SearchBudget) -> Result<EngineReport, CoachError> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&budget.go_command()).await?;

        let mut report = EngineReport::default();
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();

            if trimmed.starts_with("info") && trimmed.contains(" score ") {
                // "score mate 0" arrives without a pv when the side to move is mated
                if let Some(cp) = parse_cp(trimmed) {
                    report.score = Some(RawScore::Cp(cp));
                }
                if let Some(mate) = parse_mate(trimmed) {
                    report.score = Some(RawScore::Mate(mate));
                }
                if trimmed.contains(" pv ") {
                    report.pv = parse_pv(trimmed);
                }
            } else if trimmed.starts_with("bestmove") {
                debug!(line = trimmed, "SF >");
                report.best_move = trimmed
                    .split_whitespace()
                    .nth(1)
                    .filter(|m| *m != "(none)")
                    .map(String::from);
                break;
            }
        }

        Ok(report)
    }

    async fn halt(&mut self) -> Result<(), CoachError> {
        // Whatever the abandoned search still prints is drained up to readyok
        self.send("stop").await?;
        self.send("isready").await?;
        self.wait_for("readyok").await
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

/// Spawns Stockfish processes on demand.
#[derive(Debug, Clone)]
pub struct StockfishLauncher {
    pub path: String,
    pub threads: u32,
    pub hash_mb: u32,
}

#[async_trait]
impl EngineLauncher for StockfishLauncher {
    async fn launch(&self) -> Result<Box<dyn Engine>, CoachError> {
        let engine = StockfishEngine::new(&self.path, self.threads, self.hash_mb).await?;
        info!(path = %self.path, threads = self.threads, hash_mb = self.hash_mb, "Stockfish ready");
        Ok(Box::new(engine))
    }
}

/// Value following `key` in an info line
fn parse_after(line: &str, key: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == key && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    parse_after(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    parse_after(line, "mate")
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut in_pv = false;
    let mut moves = Vec::new();

    for part in parts {
        if part == "pv" {
            in_pv = true;
            continue;
        }
        if in_pv {
            // PV ends at next keyword or end of line
            if part.starts_with("bmc") || part == "string" {
                break;
            }
            moves.push(part.to_string());
        }
    }

    moves
}
