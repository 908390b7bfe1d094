//! Send/receive orchestration between the local store and the completion API.

use crate::clients::completion::{ChatTurn, CompletionClient, CompletionError, ModelInfo};
use crate::constants::{DEFAULT_CONVERSATION_TITLE, limits};
use crate::domain::{Conversation, ConversationId, Message, NewMessage, Role, Settings, UserId};
use crate::services::chat_store::{ChatStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("The completion service did not answer within {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Message cannot be empty")]
    EmptyMessage,
}

/// The two messages persisted by one successful [`ChatService::send`].
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user: Message,
    pub assistant: Message,
}

pub struct ChatService {
    store: Arc<dyn ChatStore>,
    completion: Arc<dyn CompletionClient>,
    defaults: Settings,
    timeout: Duration,
}

impl ChatService {
    #[must_use]
    pub fn new(
        store: Arc<dyn ChatStore>,
        completion: Arc<dyn CompletionClient>,
        defaults: Settings,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            completion,
            defaults,
            timeout,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }

    /// Stored settings, or the configured defaults for users who never saved any.
    pub async fn settings_for(&self, user_id: &UserId) -> Result<Settings, ChatError> {
        Ok(self
            .store
            .get_settings(user_id)
            .await?
            .unwrap_or_else(|| self.defaults.clone()))
    }

    pub async fn start_conversation(
        &self,
        user_id: &UserId,
        title: Option<&str>,
    ) -> Result<Conversation, ChatError> {
        let title = clean_title(title.unwrap_or_default());
        Ok(self.store.create_conversation(user_id, &title).await?)
    }

    pub async fn rename_conversation(
        &self,
        conversation_id: &ConversationId,
        title: &str,
    ) -> Result<(), ChatError> {
        let title = clean_title(title);
        Ok(self
            .store
            .rename_conversation(conversation_id, &title)
            .await?)
    }

    /// Persists the user's message, asks for a reply, and persists the reply.
    ///
    /// The user message stays stored even when the completion fails or times
    /// out; the assistant message is only written after a full response.
    pub async fn send(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        attachment: Option<String>,
        settings: &Settings,
    ) -> Result<Exchange, ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let mut message = NewMessage::new(Role::User, content);
        if let Some(attachment) = attachment {
            message = message.with_attachment(attachment);
        }
        let user = self.store.append_message(conversation_id, message).await?;

        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.clone()))?;
        let history = build_history(&settings.system_prompt, &conversation.messages);

        debug!(
            conversation_id = %conversation_id,
            turns = history.len(),
            "Sending conversation to completion service"
        );

        let params = settings.generation_params();
        let completion = tokio::time::timeout(
            self.timeout,
            self.completion
                .complete(&settings.api_key, &params, &history),
        )
        .await
        .map_err(|_| {
            warn!(conversation_id = %conversation_id, "Completion timed out");
            ChatError::Timeout(self.timeout)
        })??;

        let assistant = self
            .store
            .append_message(
                conversation_id,
                NewMessage::new(Role::Assistant, completion.content),
            )
            .await?;

        info!(
            conversation_id = %conversation_id,
            prompt_tokens = user.tokens,
            reply_tokens = assistant.tokens,
            "Exchange completed"
        );

        Ok(Exchange { user, assistant })
    }

    pub async fn list_models(&self, settings: &Settings) -> Result<Vec<ModelInfo>, ChatError> {
        tokio::time::timeout(self.timeout, self.completion.list_models(&settings.api_key))
            .await
            .map_err(|_| ChatError::Timeout(self.timeout))?
            .map_err(ChatError::from)
    }
}

/// History sent upstream: the system prompt (when set) followed by every
/// stored message except error notes.
#[must_use]
pub fn build_history(system_prompt: &str, messages: &[Message]) -> Vec<ChatTurn> {
    let system = system_prompt.trim();
    let mut turns = Vec::with_capacity(messages.len() + 1);

    if !system.is_empty() {
        turns.push(ChatTurn::new(Role::System, system));
    }

    turns.extend(
        messages
            .iter()
            .filter(|m| m.role != Role::Error)
            .map(|m| ChatTurn::new(m.role, m.content.clone())),
    );

    turns
}

/// Trims and caps a title, falling back to the default for blank input.
#[must_use]
pub fn clean_title(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return DEFAULT_CONVERSATION_TITLE.to_string();
    }
    title.chars().take(limits::MAX_TITLE_CHARS).collect()
}
