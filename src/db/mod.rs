use crate::config::SecurityConfig;
use crate::domain::{Conversation, ConversationId, Message, NewMessage, Settings, UserId};
use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::user::PasswordCheck;

/// Current time as an RFC 3339 UTC string with fixed microsecond precision.
///
/// Fixed width keeps lexical order identical to chronological order, which the
/// `ORDER BY updated_at` queries rely on.
#[must_use]
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn conversation_repo(&self) -> repositories::conversation::ConversationRepository {
        repositories::conversation::ConversationRepository::new(self.conn.clone())
    }

    fn settings_repo(&self) -> repositories::settings::SettingsRepository {
        repositories::settings::SettingsRepository::new(self.conn.clone())
    }

    // ========== User Repository Methods ==========

    /// Returns `None` when the email is already taken.
    pub async fn create_user(
        &self,
        email: &str,
        username: Option<&str>,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<Option<UserId>> {
        self.user_repo()
            .create(email, username, password, security)
            .await
    }

    pub async fn verify_user_password(&self, email: &str, password: &str) -> Result<PasswordCheck> {
        self.user_repo().verify_password(email, password).await
    }

    pub async fn record_login(&self, id: &UserId) -> Result<()> {
        self.user_repo().record_login(id).await
    }

    pub async fn get_last_login(&self, id: &UserId) -> Result<Option<String>> {
        self.user_repo().last_login(id).await
    }

    // ========== Conversation Repository Methods ==========

    /// Returns `None` when the owning user does not exist.
    pub async fn create_conversation(
        &self,
        user_id: &UserId,
        title: &str,
    ) -> Result<Option<Conversation>> {
        self.conversation_repo().create(user_id, title).await
    }

    pub async fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        self.conversation_repo().get(id).await
    }

    pub async fn list_conversations(&self, user_id: &UserId) -> Result<Vec<Conversation>> {
        self.conversation_repo().list_for_user(user_id).await
    }

    /// Returns `None` when the conversation does not exist.
    pub async fn append_message(
        &self,
        conversation_id: &ConversationId,
        message: NewMessage,
    ) -> Result<Option<Message>> {
        self.conversation_repo()
            .append_message(conversation_id, message)
            .await
    }

    pub async fn rename_conversation(&self, id: &ConversationId, title: &str) -> Result<bool> {
        self.conversation_repo().rename(id, title).await
    }

    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<bool> {
        self.conversation_repo().delete(id).await
    }

    pub async fn count_messages(&self, conversation_id: &ConversationId) -> Result<u64> {
        self.conversation_repo()
            .count_messages(conversation_id)
            .await
    }

    // ========== Settings Repository Methods ==========

    pub async fn get_settings(&self, user_id: &UserId) -> Result<Option<Settings>> {
        self.settings_repo().get(user_id).await
    }

    /// Returns `false` when the user does not exist.
    pub async fn put_settings(&self, user_id: &UserId, settings: &Settings) -> Result<bool> {
        self.settings_repo().upsert(user_id, settings).await
    }
}
