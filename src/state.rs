use std::sync::Arc;
use std::time::Duration;

use crate::clients::{CompletionClient, OpenAiClient};
use crate::config::{CompletionConfig, Config};
use crate::services::{ChatService, ChatStore, SeaOrmChatStore};
use crate::session::SessionStore;

/// Build the HTTP client used for every call to the completion service.
fn build_shared_http_client(config: &CompletionConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .user_agent(&config.user_agent)
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

/// Everything a command needs, built once per process.
pub struct AppState {
    pub config: Config,

    pub store: Arc<dyn ChatStore>,

    pub chat: ChatService,

    pub session: SessionStore,
}

impl AppState {
    /// Wires the SQLite store and the OpenAI-compatible client. Nothing touches
    /// the database until the first store operation.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn ChatStore> = Arc::new(SeaOrmChatStore::from_config(&config));

        let http_client = build_shared_http_client(&config.completion)?;
        let completion: Arc<dyn CompletionClient> = Arc::new(OpenAiClient::with_shared_client(
            http_client,
            &config.completion.base_url,
        ));

        Ok(Self::with_components(config, store, completion))
    }

    #[must_use]
    pub fn with_components(
        config: Config,
        store: Arc<dyn ChatStore>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        let chat = ChatService::new(
            store.clone(),
            completion,
            config.defaults.to_settings(),
            Duration::from_secs(config.completion.request_timeout_seconds),
        );
        let session = SessionStore::from_config(&config);

        Self {
            config,
            store,
            chat,
            session,
        }
    }
}
