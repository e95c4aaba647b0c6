use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::result::PipelineResult;

const MAX_TITLE_CHARS: usize = 30;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize run log: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOutput {
    pub story_path: PathBuf,
    pub log_path: PathBuf,
}

/// Destination for a finished run.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn store(&self, result: &PipelineResult) -> Result<StoredOutput, SinkError>;
}

/// Writes the story as Markdown and the run artifacts as JSON.
pub struct FileSink {
    output_dir: PathBuf,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

/// File-name-safe version of a title.
pub fn safe_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let safe: String = kept
        .trim()
        .replace(' ', "_")
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();

    if safe.is_empty() { "story".to_string() } else { safe }
}

pub fn render_markdown(result: &PipelineResult) -> String {
    format!(
        "# {}\n\n*Style: {}*\n\n---\n\n{}\n",
        result.map.new_title,
        result.style.label(),
        result.final_text
    )
}

async fn write(path: &Path, contents: &[u8]) -> Result<(), SinkError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl OutputSink for FileSink {
    async fn store(&self, result: &PipelineResult) -> Result<StoredOutput, SinkError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| SinkError::Io {
                path: self.output_dir.clone(),
                source,
            })?;

        let now = Local::now();
        let stem = format!("{}_{}", safe_title(&result.map.new_title), now.format("%Y%m%d_%H%M%S"));
        let story_path = self.output_dir.join(format!("{stem}.md"));
        let log_path = self.output_dir.join(format!("{stem}_log.json"));

        write(&story_path, render_markdown(result).as_bytes()).await?;

        let log = serde_json::json!({
            "generated_at": now.to_rfc3339(),
            "run_id": result.run_id,
            "source_digest": result.source_digest,
            "original_contract": result.essence,
            "context_map": result.map,
            "style_used": result.style,
            "target_context": result.target_context,
            "word_count": result.word_count,
            "stages": result.stages,
        });
        write(&log_path, serde_json::to_string_pretty(&log)?.as_bytes()).await?;

        info!(story = %story_path.display(), log = %log_path.display(), "Saved transformation output");
        Ok(StoredOutput {
            story_path,
            log_path,
        })
    }
}
