use serde::Serialize;
use std::time::{Duration, Instant};

use crate::error::Stage;

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Cost of one finished stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub latency_ms: u64,
    /// Requests sent to the backend, retries included
    pub model_calls: usize,
    pub schema_retries: usize,
    pub semantic_retries: usize,
    pub transport_retries: usize,
}

/// Running counters for a stage while it is in progress.
#[derive(Debug, Default)]
pub struct StageTally {
    model_calls: usize,
    schema_retries: usize,
    semantic_retries: usize,
    transport_retries: usize,
}

impl StageTally {
    /// Account for one adapter call that produced `attempts` parsed responses.
    pub fn record_completion(&mut self, attempts: usize, transport_retries: usize) {
        self.model_calls += attempts + transport_retries;
        self.schema_retries += attempts.saturating_sub(1);
        self.transport_retries += transport_retries;
    }

    pub fn record_semantic_retry(&mut self) {
        self.semantic_retries += 1;
    }

    pub fn finish(self, stage: Stage, timer: &TimedOperation) -> StageReport {
        StageReport {
            stage,
            latency_ms: timer.elapsed().as_millis() as u64,
            model_calls: self.model_calls,
            schema_retries: self.schema_retries,
            semantic_retries: self.semantic_retries,
            transport_retries: self.transport_retries,
        }
    }
}
