use llm::{AdapterError, AdapterErrorKind};
use serde::Serialize;
use std::fmt;
use story::{UnknownStyle, Violations};
use thiserror::Error;

/// Problems detected before any model call is made.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no API key found: set GROQ_API_KEY or pass --api-key")]
    MissingCredential,

    #[error("source text is empty")]
    EmptySourceText,

    #[error("source text is too short ({found} characters, at least {min} required)")]
    SourceTooShort { found: usize, min: usize },

    #[error("target context is empty")]
    EmptyTargetContext,

    #[error("target context is too short ({found} characters, at least {min} required)")]
    TargetTooShort { found: usize, min: usize },

    #[error(transparent)]
    UnknownStyle(#[from] UnknownStyle),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extracting,
    Mapping,
    Generating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extracting => "extracting",
            Stage::Mapping => "mapping",
            Stage::Generating => "generating",
        })
    }
}

#[derive(Debug, Error)]
pub enum FailureCause {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("semantic validation failed after {attempts} attempts: {violations}")]
    SemanticValidation { attempts: usize, violations: Violations },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TransportFailure,
    SchemaValidationExhausted,
    SemanticValidationFailure,
}

/// Terminal failure of a run, tagged with the stage that could not finish.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {cause}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub cause: FailureCause,
}

impl StageFailure {
    pub fn new(stage: Stage, cause: impl Into<FailureCause>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.cause {
            FailureCause::Adapter(e) => match e.kind() {
                AdapterErrorKind::TransportFailure => ErrorKind::TransportFailure,
                AdapterErrorKind::SchemaValidationExhausted => ErrorKind::SchemaValidationExhausted,
            },
            FailureCause::SemanticValidation { .. } => ErrorKind::SemanticValidationFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::TransportError;
    use story::Violation;

    #[test]
    fn test_kind_follows_cause() {
        let transport = StageFailure::new(
            Stage::Mapping,
            AdapterError::TransportFailure {
                attempts: 4,
                source: TransportError::RateLimited("busy".into()),
            },
        );
        assert_eq!(transport.kind(), ErrorKind::TransportFailure);
        assert!(transport.to_string().starts_with("mapping stage failed"));

        let semantic = StageFailure::new(
            Stage::Extracting,
            FailureCause::SemanticValidation {
                attempts: 2,
                violations: Violations(vec![Violation::MissingProtagonist]),
            },
        );
        assert_eq!(semantic.kind(), ErrorKind::SemanticValidationFailure);
        assert!(semantic.to_string().contains("protagonist"));
    }
}
