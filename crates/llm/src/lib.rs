//! Model client for structured and free-text completions.
//!
//! A [`CompletionBackend`] sends one request to a model endpoint. The
//! [`ModelClient`] on top of it owns the retry discipline: transport failures
//! are retried with backoff, and responses that fail the parse boundary are
//! retried with the rejection reason folded into the next prompt.

pub mod backend;
pub mod client;
pub mod groq;
pub mod parse;
pub mod retry;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;

pub use backend::{CompletionBackend, CompletionRequest, TransportError};
pub use client::{
    AdapterError, AdapterErrorKind, Completion, ModelClient, STRUCTURED_SYSTEM, TEXT_SYSTEM,
    with_feedback,
};
pub use groq::GroqBackend;
pub use parse::{ParseResult, StructuredOutput, extract_json, parse_structured, word_count};
pub use retry::RetryPolicy;
#[cfg(any(test, feature = "test-util"))]
pub use scripted::ScriptedBackend;
