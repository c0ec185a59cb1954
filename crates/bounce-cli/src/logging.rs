//! Structured stage logging.

use std::time::Instant;
use tracing::{info, warn, Span};

/// Logger for one pipeline stage.
///
/// Stages run strictly one after another; each gets a number so the log
/// reads `1/5 beats`, `2/5 measures`, and so on.
#[derive(Debug, Clone)]
pub struct StageLogger {
    stage: &'static str,
    index: usize,
    total: usize,
    started: Instant,
}

impl StageLogger {
    /// Create a logger for stage `index` of `total` (1-based).
    pub fn new(stage: &'static str, index: usize, total: usize) -> Self {
        Self {
            stage,
            index,
            total,
            started: Instant::now(),
        }
    }

    /// Log the start of the stage.
    pub fn log_start(&self, message: &str) {
        info!(
            stage = self.stage,
            step = %self.step(),
            "Stage started: {}", message
        );
    }

    /// Log a non-fatal problem.
    pub fn log_warning(&self, message: &str) {
        warn!(
            stage = self.stage,
            step = %self.step(),
            "Stage warning: {}", message
        );
    }

    /// Log completion with elapsed time.
    pub fn log_completion(&self, message: &str) {
        info!(
            stage = self.stage,
            step = %self.step(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Stage completed: {}", message
        );
    }

    /// Stage name.
    pub fn stage(&self) -> &'static str {
        self.stage
    }

    /// `index/total` label.
    pub fn step(&self) -> String {
        format!("{}/{}", self.index, self.total)
    }

    /// Span covering the stage.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("stage", stage = self.stage, step = %self.step())
    }
}
