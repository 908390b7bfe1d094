//! `SeaORM` implementation of the `ChatStore` trait.

use crate::config::{Config, GeneralConfig, SecurityConfig};
use crate::db::{PasswordCheck, Store};
use crate::domain::{Conversation, ConversationId, Message, NewMessage, Settings, User, UserId};
use crate::services::chat_store::{ChatStore, StoreError};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Lazily connected SQLite store.
///
/// Construct it once and pass it down. The first operation (or an explicit
/// [`SeaOrmChatStore::initialize`]) connects and migrates; concurrent first
/// callers wait on the same setup.
pub struct SeaOrmChatStore {
    db_url: String,
    max_connections: u32,
    min_connections: u32,
    security: SecurityConfig,
    store: OnceCell<Store>,
}

impl SeaOrmChatStore {
    #[must_use]
    pub fn new(general: &GeneralConfig, security: &SecurityConfig) -> Self {
        Self {
            db_url: general.database_path.clone(),
            max_connections: general.max_db_connections,
            min_connections: general.min_db_connections,
            security: security.clone(),
            store: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.general, &config.security)
    }

    /// Connects and applies migrations once. Safe to call repeatedly and
    /// concurrently; a failed attempt is retried by the next caller.
    pub async fn initialize(&self) -> Result<&Store, StoreError> {
        self.store
            .get_or_try_init(|| async {
                info!("Initializing local store at {}", self.db_url);
                Store::with_pool_options(&self.db_url, self.max_connections, self.min_connections)
                    .await
                    .map_err(|e| {
                        error!("Failed to initialize local store: {e:#}");
                        StoreError::StorageUnavailable(format!("{e:#}"))
                    })
            })
            .await
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.store.initialized()
    }
}

#[async_trait]
impl ChatStore for SeaOrmChatStore {
    async fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<UserId, StoreError> {
        let store = self.initialize().await?;

        store
            .create_user(email, username, password, &self.security)
            .await?
            .ok_or(StoreError::DuplicateUser)
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, StoreError> {
        let store = self.initialize().await?;

        let user = match store.verify_user_password(email, password).await? {
            PasswordCheck::NoSuchUser => return Err(StoreError::UserNotFound),
            PasswordCheck::Mismatch => return Err(StoreError::InvalidCredentials),
            PasswordCheck::Valid(user) => user,
        };

        store.record_login(&user.id).await?;
        info!(user_id = %user.id, "User logged in");

        Ok(user)
    }

    async fn create_conversation(
        &self,
        user_id: &UserId,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        let store = self.initialize().await?;

        store
            .create_conversation(user_id, title)
            .await?
            .ok_or(StoreError::UserNotFound)
    }

    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        let store = self.initialize().await?;
        Ok(store.get_conversation(conversation_id).await?)
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        message: NewMessage,
    ) -> Result<Message, StoreError> {
        let store = self.initialize().await?;

        store
            .append_message(conversation_id, message)
            .await?
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.clone()))
    }

    async fn list_conversations(&self, user_id: &UserId) -> Result<Vec<Conversation>, StoreError> {
        let store = self.initialize().await?;
        Ok(store.list_conversations(user_id).await?)
    }

    async fn rename_conversation(
        &self,
        conversation_id: &ConversationId,
        title: &str,
    ) -> Result<(), StoreError> {
        let store = self.initialize().await?;

        if store.rename_conversation(conversation_id, title).await? {
            Ok(())
        } else {
            Err(StoreError::ConversationNotFound(conversation_id.clone()))
        }
    }

    async fn delete_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<(), StoreError> {
        let store = self.initialize().await?;
        store.delete_conversation(conversation_id).await?;
        Ok(())
    }

    async fn get_settings(&self, user_id: &UserId) -> Result<Option<Settings>, StoreError> {
        let store = self.initialize().await?;
        Ok(store.get_settings(user_id).await?)
    }

    async fn put_settings(&self, user_id: &UserId, settings: &Settings) -> Result<(), StoreError> {
        let store = self.initialize().await?;

        if store.put_settings(user_id, settings).await? {
            Ok(())
        } else {
            Err(StoreError::UserNotFound)
        }
    }
}
