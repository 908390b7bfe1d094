//! Remote chat-completion boundary.

use crate::domain::{GenerationParams, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One turn of the history sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: String,
    pub owned_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub model: Option<String>,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited by the completion service")]
    RateLimited { retry_after_seconds: Option<u64> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response from completion service: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// An OpenAI-compatible chat completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Models the key can use, sorted by id.
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>, CompletionError>;

    /// Generates the assistant reply for `history`.
    async fn complete(
        &self,
        api_key: &str,
        params: &GenerationParams,
        history: &[ChatTurn],
    ) -> Result<Completion, CompletionError>;
}
