//! Chat client trait: the seam between the pipeline and the external model.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{AlimgenError, Result};

/// Stateless chat model: one system + user exchange per call, text out.
/// Determinism is not guaranteed; idempotence lives at the cache layer.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Model identifier, for logging and stats
    fn model(&self) -> &str;

    /// Whether the client is configured well enough to attempt calls
    fn is_ready(&self) -> bool;
}

/// Scripted client for tests: returns queued responses in order, then errors.
pub struct ScriptedChatClient {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedChatClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// All (system, user) pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock poisoned").len()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push((system.to_string(), user.to_string()));

        self.responses
            .lock()
            .expect("responses lock poisoned")
            .pop_front()
            .ok_or_else(|| AlimgenError::UpstreamUnavailable("scripted responses exhausted".to_string()))
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_client_returns_in_order() {
        let client = ScriptedChatClient::new(vec!["one".to_string(), "two".to_string()]);
        assert_eq!(client.complete("s", "u").await.unwrap(), "one");
        assert_eq!(client.complete("s", "u").await.unwrap(), "two");
        assert!(client.complete("s", "u").await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_client_records_calls() {
        let client = ScriptedChatClient::new(vec!["ok".to_string()]);
        client.complete("system prompt", "user message").await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "system prompt");
        assert_eq!(calls[0].1, "user message");
    }

    #[test]
    fn test_scripted_client_metadata() {
        let client = ScriptedChatClient::new(vec![]);
        assert_eq!(client.model(), "scripted");
        assert!(client.is_ready());
    }
}
