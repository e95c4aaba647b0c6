use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// Extensions accepted for story files. The empty string allows files with no extension.
pub const STORY_EXTENSIONS: [&str; 3] = ["txt", "md", ""];

pub struct FileReader;

impl FileReader {
    pub fn is_supported(path: &Path) -> bool {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        STORY_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
    }

    pub async fn read_file(path: &Path) -> Result<String> {
        if !Self::is_supported(path) {
            anyhow::bail!(
                "Unsupported story format: {:?} (use a .txt or .md file)",
                path.extension().unwrap_or_default()
            );
        }

        fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read story file: {}", path.display()))
    }
}
