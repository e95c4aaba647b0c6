use story::Style;

use crate::error::ConfigurationError;

pub const MIN_SOURCE_CHARS: usize = 50;
pub const MIN_TARGET_CHARS: usize = 3;

/// Validated input for one run. Fields are fixed at construction.
#[derive(Debug, Clone)]
pub struct TransformationRequest {
    source_text: String,
    target_context: String,
    style: Style,
}

impl TransformationRequest {
    pub fn new(
        source_text: impl Into<String>,
        target_context: impl Into<String>,
        style: Style,
    ) -> Result<Self, ConfigurationError> {
        let source_text = source_text.into();
        let target_context = target_context.into();

        let source_chars = source_text.trim().chars().count();
        if source_chars == 0 {
            return Err(ConfigurationError::EmptySourceText);
        }
        if source_chars < MIN_SOURCE_CHARS {
            return Err(ConfigurationError::SourceTooShort {
                found: source_chars,
                min: MIN_SOURCE_CHARS,
            });
        }

        let target_chars = target_context.trim().chars().count();
        if target_chars == 0 {
            return Err(ConfigurationError::EmptyTargetContext);
        }
        if target_chars < MIN_TARGET_CHARS {
            return Err(ConfigurationError::TargetTooShort {
                found: target_chars,
                min: MIN_TARGET_CHARS,
            });
        }

        Ok(Self {
            source_text,
            target_context,
            style,
        })
    }

    /// Same as [`TransformationRequest::new`] with the style given as text.
    pub fn parse(
        source_text: impl Into<String>,
        target_context: impl Into<String>,
        style: &str,
    ) -> Result<Self, ConfigurationError> {
        let style: Style = style.parse()?;
        Self::new(source_text, target_context, style)
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn target_context(&self) -> &str {
        &self.target_context
    }

    pub fn style(&self) -> Style {
        self.style
    }
}
