pub mod builtin;
pub mod reader;

pub use builtin::CINDERELLA;
pub use reader::FileReader;

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

/// Inline text at or below this length is treated as a mistyped path or keyword.
pub const MIN_INLINE_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    File(PathBuf),
    BuiltIn,
    Inline,
}

#[derive(Debug, Clone)]
pub struct SourceText {
    pub origin: SourceOrigin,
    pub text: String,
}

/// Generate a stable digest for a source story
pub fn source_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Resolve a source argument: an existing file, the built-in keyword, or the
/// story text itself.
pub async fn load_source(arg: &str) -> Result<SourceText> {
    let path = Path::new(arg);

    if path.is_file() {
        info!(path = %path.display(), "Loading story from file");
        let text = FileReader::read_file(path).await?;
        if text.trim().is_empty() {
            anyhow::bail!("Story file is empty: {:?}", path);
        }
        return Ok(SourceText {
            origin: SourceOrigin::File(path.to_path_buf()),
            text,
        });
    }

    if arg.trim().eq_ignore_ascii_case(builtin::CINDERELLA_KEYWORD) {
        info!("Using built-in Cinderella story");
        return Ok(SourceText {
            origin: SourceOrigin::BuiltIn,
            text: CINDERELLA.to_string(),
        });
    }

    if arg.trim().chars().count() > MIN_INLINE_CHARS {
        info!(chars = arg.len(), "Using provided text as story");
        return Ok(SourceText {
            origin: SourceOrigin::Inline,
            text: arg.to_string(),
        });
    }

    anyhow::bail!("'{}' is not a readable file, a known story, or story text", arg)
}
