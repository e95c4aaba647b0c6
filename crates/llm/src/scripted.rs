use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::backend::{CompletionBackend, CompletionRequest, TransportError};

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Delayed(Duration, String),
    Fail(TransportError),
}

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<Scripted>,
    requests: Vec<CompletionRequest>,
}

/// In-memory backend that replays queued responses in order and records
/// every request it receives. Clones share the same script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, content: impl Into<String>) -> Self {
        self.push(Scripted::Reply(content.into()));
        self
    }

    pub fn with_delayed_reply(self, delay: Duration, content: impl Into<String>) -> Self {
        self.push(Scripted::Delayed(delay, content.into()));
        self
    }

    pub fn with_failure(self, error: TransportError) -> Self {
        self.push(Scripted::Fail(error));
        self
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.lock().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn remaining(&self) -> usize {
        self.lock().responses.len()
    }

    fn push(&self, entry: Scripted) {
        self.lock().responses.push_back(entry);
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, TransportError> {
        let next = {
            let mut script = self.lock();
            script.requests.push(request.clone());
            script.responses.pop_front()
        };

        match next {
            Some(Scripted::Reply(content)) => Ok(content),
            Some(Scripted::Delayed(delay, content)) => {
                tokio::time::sleep(delay).await;
                Ok(content)
            }
            Some(Scripted::Fail(error)) => Err(error),
            None => Err(TransportError::Client {
                status: 0,
                body: "scripted backend has no responses left".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_and_records() {
        let backend = ScriptedBackend::new()
            .with_reply("first")
            .with_failure(TransportError::RateLimited("later".into()))
            .with_reply("second");
        let observer = backend.clone();

        let request = CompletionRequest::text("system", "prompt");
        assert_eq!(backend.complete(&request).await.unwrap(), "first");
        assert!(backend.complete(&request).await.is_err());
        assert_eq!(backend.complete(&request).await.unwrap(), "second");

        assert_eq!(observer.call_count(), 3);
        assert_eq!(observer.remaining(), 0);
        assert_eq!(observer.requests()[0].prompt, "prompt");
    }

    #[tokio::test]
    async fn test_exhausted_script_is_fatal() {
        let backend = ScriptedBackend::new();
        let err = backend
            .complete(&CompletionRequest::text("s", "p"))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
