//! Persistence façade for users, conversations and settings.
//!
//! Callers only ever see this trait; the storage engine behind it is an
//! implementation detail of [`crate::services::SeaOrmChatStore`].

use crate::domain::{Conversation, ConversationId, Message, NewMessage, Settings, User, UserId};
use thiserror::Error;

/// Errors surfaced by the persistence façade.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A user with this email already exists")]
    DuplicateUser,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

/// Domain service trait for local persistence.
#[async_trait::async_trait]
pub trait ChatStore: Send + Sync {
    /// Creates a user with a freshly salted password hash.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateUser`] if the email (compared without
    /// regard to case) is already registered.
    async fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<UserId, StoreError>;

    /// Verifies credentials, records the login time, and returns the user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UserNotFound`] for an unknown email and
    /// [`StoreError::InvalidCredentials`] for a wrong password.
    async fn login(&self, email: &str, password: &str) -> Result<User, StoreError>;

    /// Creates an empty conversation owned by `user_id`.
    async fn create_conversation(
        &self,
        user_id: &UserId,
        title: &str,
    ) -> Result<Conversation, StoreError>;

    /// Loads one conversation with its messages, or `None`.
    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Conversation>, StoreError>;

    /// Appends a message after all existing ones and advances the
    /// conversation's `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConversationNotFound`] if the conversation is gone.
    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        message: NewMessage,
    ) -> Result<Message, StoreError>;

    /// All of a user's conversations, most recently updated first, with messages.
    async fn list_conversations(&self, user_id: &UserId) -> Result<Vec<Conversation>, StoreError>;

    async fn rename_conversation(
        &self,
        conversation_id: &ConversationId,
        title: &str,
    ) -> Result<(), StoreError>;

    /// Deletes the conversation and its messages. Deleting an unknown id is a no-op.
    async fn delete_conversation(&self, conversation_id: &ConversationId)
    -> Result<(), StoreError>;

    /// `None` when the user never saved settings.
    async fn get_settings(&self, user_id: &UserId) -> Result<Option<Settings>, StoreError>;

    /// Replaces the user's settings. Values are not range-checked here.
    async fn put_settings(&self, user_id: &UserId, settings: &Settings) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn db_errors_convert_to_storage() {
        let err: StoreError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, StoreError::Storage(_)));
    }

    #[test]
    fn context_chain_is_kept() {
        let result: Result<(), sea_orm::DbErr> = Err(sea_orm::DbErr::Custom("boom".to_string()));
        let err: StoreError = result.context("Failed to save").unwrap_err().into();
        match err {
            StoreError::Storage(msg) => {
                assert!(msg.contains("Failed to save"));
                assert!(msg.contains("boom"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::ConversationNotFound(ConversationId::from("abc"));
        assert_eq!(err.to_string(), "Conversation not found: abc");
        assert_eq!(
            StoreError::DuplicateUser.to_string(),
            "A user with this email already exists"
        );
    }
}
