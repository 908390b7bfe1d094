use crate::clients::completion::{
    ChatTurn, Completion, CompletionClient, CompletionError, ModelInfo,
};
use crate::domain::GenerationParams;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header::RETRY_AFTER};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default)]
    owned_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for OpenAI's `/chat/completions` and `/models` endpoints, or any
/// server that speaks the same protocol.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
}

impl OpenAiClient {
    #[must_use]
    pub fn with_shared_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn require_key(api_key: &str) -> Result<&str, CompletionError> {
        let key = api_key.trim();
        if key.is_empty() {
            return Err(CompletionError::Auth(
                "No API key configured. Set one with `settings set api_key <key>`".to_string(),
            ));
        }
        Ok(key)
    }

    /// Maps a non-success response to the error taxonomy, preferring the
    /// server's own `error.message` when it sends one.
    async fn error_from(response: Response) -> CompletionError {
        let status = response.status();
        let retry_after_seconds = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });

        warn!(%status, "Completion service returned an error: {message}");

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CompletionError::Auth(message),
            StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited {
                retry_after_seconds,
            },
            _ => CompletionError::Unexpected(format!("status={status}, {message}")),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>, CompletionError> {
        let key = Self::require_key(api_key)?;
        let url = format!("{}/models", self.base_url);

        let response = self.client.get(&url).bearer_auth(key).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let body: ModelsResponse = response.json().await?;
        let mut models: Vec<ModelInfo> = body
            .data
            .into_iter()
            .map(|m| ModelInfo {
                display_name: m.id.clone(),
                id: m.id,
                owned_by: m.owned_by,
            })
            .collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));

        debug!("Fetched {} models", models.len());
        Ok(models)
    }

    async fn complete(
        &self,
        api_key: &str,
        params: &GenerationParams,
        history: &[ChatTurn],
    ) -> Result<Completion, CompletionError> {
        let key = Self::require_key(api_key)?;
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &params.model,
            messages: history,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
        };

        debug!(model = %params.model, turns = history.len(), "Requesting completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CompletionError::Unexpected("response had no content".to_string()))?;

        Ok(Completion {
            content,
            model: body.model,
        })
    }
}
