use async_trait::async_trait;
use thiserror::Error;

/// One outbound model call: a fixed system instruction plus the stage prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    /// Ask the endpoint for a JSON object instead of free text
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn structured(system: &str, prompt: impl Into<String>) -> Self {
        Self {
            system: system.to_string(),
            prompt: prompt.into(),
            json_mode: true,
        }
    }

    pub fn text(system: &str, prompt: impl Into<String>) -> Self {
        Self {
            system: system.to_string(),
            prompt: prompt.into(),
            json_mode: false,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("server error (status {status}): {body}")]
    Server { status: u16, body: String },

    #[error("request rejected (status {status}): {body}")]
    Client { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response envelope: {0}")]
    MalformedEnvelope(String),
}

impl TransportError {
    /// Rejected requests (bad key, bad model name) fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Client { .. })
    }
}

/// A model endpoint that turns one request into raw response text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(TransportError::Timeout("60s".into()).is_retryable());
        assert!(TransportError::RateLimited("slow down".into()).is_retryable());
        assert!(TransportError::Server { status: 503, body: String::new() }.is_retryable());
        assert!(TransportError::MalformedEnvelope("no choices".into()).is_retryable());
        assert!(!TransportError::Client { status: 401, body: "bad key".into() }.is_retryable());
    }
}
