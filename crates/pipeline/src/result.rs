use serde::Serialize;
use story::{StoryEssence, StoryMap, Style};
use uuid::Uuid;

use crate::metrics::StageReport;

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub source_digest: String,
    pub target_context: String,
    pub style: Style,
    pub essence: StoryEssence,
    pub map: StoryMap,
    pub final_text: String,
    pub word_count: usize,
    pub stages: Vec<StageReport>,
}

impl PipelineResult {
    pub fn total_model_calls(&self) -> usize {
        self.stages.iter().map(|s| s.model_calls).sum()
    }

    pub fn total_latency_ms(&self) -> u64 {
        self.stages.iter().map(|s| s.latency_ms).sum()
    }
}
