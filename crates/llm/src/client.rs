use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::backend::{CompletionBackend, CompletionRequest, TransportError};
use crate::parse::{ParseResult, StructuredOutput, parse_structured, word_count};
use crate::retry::RetryPolicy;

/// System instruction for every structured (JSON) call.
pub const STRUCTURED_SYSTEM: &str = "You are a meticulous story analyst. Respond only with a single JSON \
object that matches the structure described in the user message. Do not add commentary, Markdown, or \
code fences.";

/// System instruction for every prose call.
pub const TEXT_SYSTEM: &str = "You are an accomplished fiction writer. Respond only with the requested \
story text, without preamble, notes, or commentary about the writing.";

pub const DEFAULT_SCHEMA_ATTEMPTS: usize = 3;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    SchemaValidationExhausted,
    TransportFailure,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{schema} response still invalid after {attempts} attempts: {last_reason}")]
    SchemaValidationExhausted {
        schema: &'static str,
        attempts: usize,
        last_reason: String,
    },

    #[error("model call failed after {attempts} attempts: {source}")]
    TransportFailure {
        attempts: usize,
        #[source]
        source: TransportError,
    },
}

impl AdapterError {
    pub fn kind(&self) -> AdapterErrorKind {
        match self {
            AdapterError::SchemaValidationExhausted { .. } => AdapterErrorKind::SchemaValidationExhausted,
            AdapterError::TransportFailure { .. } => AdapterErrorKind::TransportFailure,
        }
    }
}

/// A validated model output plus how much it cost to get it.
#[derive(Debug, Clone)]
pub struct Completion<T> {
    pub value: T,
    /// Model responses parsed, including rejected ones
    pub attempts: usize,
    pub transport_retries: usize,
}

/// Append a corrective note explaining why the previous answer was rejected.
pub fn with_feedback(prompt: &str, reason: &str) -> String {
    format!(
        "{prompt}\n\nIMPORTANT: Your previous response was rejected because: {reason}\n\
         Correct this problem and answer again, following every instruction above."
    )
}

/// Model client with one fixed system instruction per call mode, a per-call
/// timeout, a transport retry budget, and a separate corrective retry budget
/// for responses that fail to parse.
pub struct ModelClient<B> {
    backend: B,
    retry: RetryPolicy,
    schema_attempts: usize,
    request_timeout: Duration,
}

impl<B: CompletionBackend> ModelClient<B> {
    pub fn new(backend: B, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            schema_attempts: DEFAULT_SCHEMA_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_schema_attempts(mut self, attempts: usize) -> Self {
        self.schema_attempts = attempts.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Ask for a JSON record of type `T`, feeding parse failures back into the
    /// prompt until it validates or the schema budget runs out.
    pub async fn complete_structured<T: StructuredOutput>(
        &self,
        prompt: &str,
    ) -> Result<Completion<T>, AdapterError> {
        let mut prior_failure: Option<String> = None;
        let mut transport_retries = 0;

        for attempt in 1..=self.schema_attempts {
            let prompt = match prior_failure.as_deref() {
                Some(reason) => with_feedback(prompt, reason),
                None => prompt.to_string(),
            };
            debug!(schema = T::NAME, attempt, prompt_chars = prompt.len(), "Requesting structured completion");

            let request = CompletionRequest::structured(STRUCTURED_SYSTEM, prompt);
            let (raw, retries) = self.send(&request).await?;
            transport_retries += retries;

            match parse_structured::<T>(&raw) {
                ParseResult::Parsed(value) => {
                    if attempt > 1 {
                        info!(schema = T::NAME, attempts = attempt, "Response validated after corrective retries");
                    }
                    return Ok(Completion {
                        value,
                        attempts: attempt,
                        transport_retries,
                    });
                }
                ParseResult::Rejected(reason) => {
                    warn!(
                        schema = T::NAME,
                        attempt = attempt,
                        max_attempts = self.schema_attempts,
                        reason = %reason,
                        "Response failed schema validation"
                    );
                    if attempt < self.schema_attempts {
                        sleep(self.retry.backoff_for(attempt)).await;
                    }
                    prior_failure = Some(reason);
                }
            }
        }

        Err(AdapterError::SchemaValidationExhausted {
            schema: T::NAME,
            attempts: self.schema_attempts,
            last_reason: prior_failure.unwrap_or_default(),
        })
    }

    /// Ask for free prose. Blank responses are retried within the schema
    /// budget; the length floor is reported but left to the caller.
    pub async fn complete_text(
        &self,
        prompt: &str,
        min_words: usize,
    ) -> Result<Completion<String>, AdapterError> {
        let request = CompletionRequest::text(TEXT_SYSTEM, prompt);
        let mut transport_retries = 0;

        for attempt in 1..=self.schema_attempts {
            let (text, retries) = self.send(&request).await?;
            transport_retries += retries;

            if text.trim().is_empty() {
                warn!(attempt, max_attempts = self.schema_attempts, "Model returned empty prose");
                if attempt < self.schema_attempts {
                    sleep(self.retry.backoff_for(attempt)).await;
                }
                continue;
            }

            let words = word_count(&text);
            if words < min_words {
                warn!(words, min_words, "Prose is shorter than requested");
            }
            return Ok(Completion {
                value: text,
                attempts: attempt,
                transport_retries,
            });
        }

        Err(AdapterError::SchemaValidationExhausted {
            schema: "prose",
            attempts: self.schema_attempts,
            last_reason: "the model returned an empty response".to_string(),
        })
    }

    /// One logical call: transport retries happen here and never touch the
    /// schema budget. Returns the response and the number of retries used.
    async fn send(&self, request: &CompletionRequest) -> Result<(String, usize), AdapterError> {
        let mut calls: usize = 0;

        let result = self
            .retry
            .retry_if(
                "model_completion",
                || {
                    calls += 1;
                    self.call_once(request)
                },
                TransportError::is_retryable,
            )
            .await;

        match result {
            Ok(text) => Ok((text, calls.saturating_sub(1))),
            Err(source) => Err(AdapterError::TransportFailure {
                attempts: calls,
                source,
            }),
        }
    }

    async fn call_once(&self, request: &CompletionRequest) -> Result<String, TransportError> {
        match tokio::time::timeout(self.request_timeout, self.backend.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(format!(
                "no response within {:?}",
                self.request_timeout
            ))),
        }
    }
}
