use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("valid fence pattern"));

/// A record the model is asked to produce as JSON.
pub trait StructuredOutput: DeserializeOwned {
    /// Name used in diagnostics fed back to the model
    const NAME: &'static str;

    /// Structural rules serde cannot express, such as required non-empty text.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Outcome of pushing one raw model response through the parse boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult<T> {
    Parsed(T),
    Rejected(String),
}

/// Locate the JSON object inside a response that may carry code fences or chatter.
pub fn extract_json(raw: &str) -> Option<&str> {
    let body = match FENCED_BLOCK.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => raw,
    };

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

pub fn parse_structured<T: StructuredOutput>(raw: &str) -> ParseResult<T> {
    let Some(json) = extract_json(raw) else {
        return ParseResult::Rejected(format!(
            "the response did not contain a JSON object for {}",
            T::NAME
        ));
    };

    let value: T = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            return ParseResult::Rejected(format!("the response is not a valid {}: {}", T::NAME, e));
        }
    };

    match value.check() {
        Ok(()) => ParseResult::Parsed(value),
        Err(reason) => ParseResult::Rejected(format!("{} is incomplete: {}", T::NAME, reason)),
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
