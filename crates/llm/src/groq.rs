use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::{CompletionBackend, CompletionRequest, TransportError};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Chat-completions client for Groq and other OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct GroqBackend {
    base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GroqBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl GroqBackend {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            temperature: 0.7,
            api_key: api_key.into(),
            client,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionBackend for GroqBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, TransportError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: self.temperature,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                408 => TransportError::Timeout(format!("endpoint returned 408: {}", body)),
                429 => TransportError::RateLimited(body),
                code if status.is_server_error() => TransportError::Server { status: code, body },
                code => TransportError::Client { status: code, body },
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedEnvelope(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                TransportError::MalformedEnvelope("response contained no message content".to_string())
            })
    }
}

fn classify_send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn reply(content: &str) -> String {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_structured_request_uses_json_mode() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "test-model",
                "response_format": {"type": "json_object"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply(r#"{"title": "Cinderella"}"#))
            .create_async()
            .await;

        let backend = GroqBackend::new("test-key", server.url(), "test-model").unwrap();
        let request = CompletionRequest::structured("only json", "extract");

        let content = backend.complete(&request).await.unwrap();
        assert_eq!(content, r#"{"title": "Cinderella"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_text_request_omits_response_format() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply("Once upon a time in Mumbai..."))
            .create_async()
            .await;

        let backend = GroqBackend::new("test-key", server.url(), "test-model").unwrap();
        let request = CompletionRequest::text("prose", "write");

        let content = backend.complete(&request).await.unwrap();
        assert!(content.starts_with("Once upon a time"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let backend = GroqBackend::new("test-key", server.url(), "test-model").unwrap();
        let err = backend
            .complete(&CompletionRequest::text("s", "p"))
            .await
            .unwrap_err();

        assert_eq!(err, TransportError::RateLimited("slow down".to_string()));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .create_async()
            .await;

        let backend = GroqBackend::new("test-key", server.url(), "test-model").unwrap();
        let err = backend
            .complete(&CompletionRequest::text("s", "p"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Server { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unauthorized_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let backend = GroqBackend::new("bad-key", server.url(), "test-model").unwrap();
        let err = backend
            .complete(&CompletionRequest::text("s", "p"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Client { status: 401, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let backend = GroqBackend::new("test-key", server.url(), "test-model").unwrap();
        let err = backend
            .complete(&CompletionRequest::text("s", "p"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let backend = GroqBackend::new("secret-key", DEFAULT_BASE_URL, DEFAULT_MODEL).unwrap();
        let printed = format!("{:?}", backend);
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("REDACTED"));
    }
}
