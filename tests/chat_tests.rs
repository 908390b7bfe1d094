//! Integration tests for the send/receive flow.

use async_trait::async_trait;
use chatkeep::clients::{
    ChatTurn, Completion, CompletionClient, CompletionError, ModelInfo, OpenAiClient,
};
use chatkeep::config::{Config, SecurityConfig};
use chatkeep::domain::{ConversationId, GenerationParams, NewMessage, Role, UserId};
use chatkeep::services::{ChatError, ChatService, ChatStore, SeaOrmChatStore, StoreError};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

enum Reply {
    Text(&'static str),
    Fail(fn() -> CompletionError),
    Hang,
}

struct ScriptedClient {
    reply: Reply,
    seen: Mutex<Vec<Vec<ChatTurn>>>,
}

impl ScriptedClient {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn last_history(&self) -> Vec<ChatTurn> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn list_models(&self, _api_key: &str) -> Result<Vec<ModelInfo>, CompletionError> {
        match self.reply {
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
            _ => Ok(vec![ModelInfo {
                id: "gpt-4o".to_string(),
                display_name: "gpt-4o".to_string(),
                owned_by: None,
            }]),
        }
    }

    async fn complete(
        &self,
        _api_key: &str,
        _params: &GenerationParams,
        history: &[ChatTurn],
    ) -> Result<Completion, CompletionError> {
        self.seen.lock().unwrap().push(history.to_vec());

        match &self.reply {
            Reply::Text(text) => Ok(Completion {
                content: (*text).to_string(),
                model: None,
            }),
            Reply::Fail(make) => Err(make()),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(CompletionError::Network("unreachable".to_string()))
            }
        }
    }
}

struct Harness {
    config: Config,
    store: Arc<SeaOrmChatStore>,
    user: UserId,
}

async fn harness() -> Harness {
    let db_path =
        std::env::temp_dir().join(format!("chatkeep-chat-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security = SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
    };

    let store = Arc::new(SeaOrmChatStore::from_config(&config));
    let user = store
        .register("chat@example.com", "pw", None)
        .await
        .expect("failed to register user");

    Harness {
        config,
        store,
        user,
    }
}

impl Harness {
    fn service(&self, client: Arc<dyn CompletionClient>, timeout: Duration) -> ChatService {
        ChatService::new(
            self.store.clone(),
            client,
            self.config.defaults.to_settings(),
            timeout,
        )
    }
}

#[tokio::test]
async fn send_persists_both_sides_of_the_exchange() {
    let h = harness().await;
    let client = ScriptedClient::new(Reply::Text("Paris."));
    let chat = h.service(client.clone(), Duration::from_secs(5));

    let conversation = chat.start_conversation(&h.user, None).await.unwrap();
    assert_eq!(conversation.title, "New Conversation");

    let mut settings = chat.settings_for(&h.user).await.unwrap();
    settings.api_key = "sk-test".to_string();

    let exchange = chat
        .send(
            &conversation.id,
            "What is the capital of France?",
            None,
            &settings,
        )
        .await
        .unwrap();

    assert_eq!(exchange.user.role, Role::User);
    assert_eq!(exchange.assistant.role, Role::Assistant);
    assert_eq!(exchange.assistant.content, "Paris.");
    assert_eq!(exchange.assistant.tokens, 2);

    let history = client.last_history();
    assert_eq!(
        history,
        vec![
            ChatTurn::new(Role::System, "You are a helpful assistant."),
            ChatTurn::new(Role::User, "What is the capital of France?"),
        ]
    );

    let stored = h
        .store
        .get_conversation(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    let roles: Vec<Role> = stored.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
}

#[tokio::test]
async fn history_skips_error_notes() {
    let h = harness().await;
    let client = ScriptedClient::new(Reply::Text("ok"));
    let chat = h.service(client.clone(), Duration::from_secs(5));

    let conversation = chat
        .start_conversation(&h.user, Some("Errors"))
        .await
        .unwrap();
    h.store
        .append_message(&conversation.id, NewMessage::new(Role::User, "first"))
        .await
        .unwrap();
    h.store
        .append_message(
            &conversation.id,
            NewMessage::new(Role::Error, "Request failed"),
        )
        .await
        .unwrap();

    let mut settings = chat.settings_for(&h.user).await.unwrap();
    settings.system_prompt = String::new();

    chat.send(&conversation.id, "second", None, &settings)
        .await
        .unwrap();

    let contents: Vec<String> = client
        .last_history()
        .into_iter()
        .map(|t| t.content)
        .collect();
    assert_eq!(contents, vec!["first", "second"]);
}

#[tokio::test]
async fn failed_completion_keeps_user_message_only() {
    let h = harness().await;
    let client = ScriptedClient::new(Reply::Fail(|| {
        CompletionError::RateLimited {
            retry_after_seconds: None,
        }
    }));
    let chat = h.service(client, Duration::from_secs(5));

    let conversation = chat.start_conversation(&h.user, None).await.unwrap();
    let settings = chat.settings_for(&h.user).await.unwrap();

    let err = chat
        .send(&conversation.id, "hello", None, &settings)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChatError::Completion(CompletionError::RateLimited { .. })
    ));

    let stored = h
        .store
        .get_conversation(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.messages.len(), 1);
    assert_eq!(stored.messages[0].role, Role::User);
    assert_eq!(stored.messages[0].content, "hello");
}

#[tokio::test]
async fn timed_out_completion_appends_no_reply() {
    let h = harness().await;
    let chat = h.service(ScriptedClient::new(Reply::Hang), Duration::from_millis(50));

    let conversation = chat.start_conversation(&h.user, None).await.unwrap();
    let settings = chat.settings_for(&h.user).await.unwrap();

    let err = chat
        .send(&conversation.id, "are you there?", None, &settings)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Timeout(_)));

    let stored = h
        .store
        .get_conversation(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.messages.iter().all(|m| m.role != Role::Assistant));
    assert_eq!(stored.messages.len(), 1);
}

#[tokio::test]
async fn dropped_send_appends_no_reply() {
    let h = harness().await;
    let chat = h.service(ScriptedClient::new(Reply::Hang), Duration::from_secs(60));

    let conversation = chat.start_conversation(&h.user, None).await.unwrap();
    let settings = chat.settings_for(&h.user).await.unwrap();

    let cancelled = tokio::time::timeout(
        Duration::from_millis(100),
        chat.send(&conversation.id, "never mind", None, &settings),
    )
    .await;
    assert!(cancelled.is_err());

    let stored = h
        .store
        .get_conversation(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.messages.iter().all(|m| m.role != Role::Assistant));
}

#[tokio::test]
async fn blank_message_is_rejected_before_storing() {
    let h = harness().await;
    let client = ScriptedClient::new(Reply::Text("unused"));
    let chat = h.service(client.clone(), Duration::from_secs(5));

    let conversation = chat.start_conversation(&h.user, None).await.unwrap();
    let settings = chat.settings_for(&h.user).await.unwrap();

    let err = chat
        .send(&conversation.id, "   ", None, &settings)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::EmptyMessage));
    assert!(client.seen.lock().unwrap().is_empty());

    let stored = h
        .store
        .get_conversation(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.messages.is_empty());
}

#[tokio::test]
async fn send_to_missing_conversation_fails() {
    let h = harness().await;
    let chat = h.service(ScriptedClient::new(Reply::Text("unused")), Duration::from_secs(5));
    let settings = chat.settings_for(&h.user).await.unwrap();

    let err = chat
        .send(&ConversationId::generate(), "hello", None, &settings)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChatError::Store(StoreError::ConversationNotFound(_))
    ));
}

#[tokio::test]
async fn settings_fall_back_to_configured_defaults() {
    let h = harness().await;
    let chat = h.service(ScriptedClient::new(Reply::Text("unused")), Duration::from_secs(5));

    let defaults = chat.settings_for(&h.user).await.unwrap();
    assert_eq!(defaults.selected_model, "gpt-3.5-turbo");
    assert_eq!(defaults.max_tokens, 150);
    assert!(defaults.api_key.is_empty());

    let mut custom = defaults.clone();
    custom.selected_model = "gpt-4o".to_string();
    h.store.put_settings(&h.user, &custom).await.unwrap();

    assert_eq!(chat.settings_for(&h.user).await.unwrap(), custom);
}

#[tokio::test]
async fn list_models_is_bounded_by_timeout() {
    let h = harness().await;
    let settings = h.config.defaults.to_settings();

    let chat = h.service(ScriptedClient::new(Reply::Text("")), Duration::from_secs(5));
    let models = chat.list_models(&settings).await.unwrap();
    assert_eq!(models[0].id, "gpt-4o");

    let chat = h.service(ScriptedClient::new(Reply::Hang), Duration::from_millis(50));
    let err = chat.list_models(&settings).await.unwrap_err();
    assert!(matches!(err, ChatError::Timeout(_)));
}

#[tokio::test]
async fn end_to_end_against_mock_completion_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello from the mock!"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness().await;
    let client = OpenAiClient::with_shared_client(
        reqwest::Client::new(),
        &format!("{}/v1", server.uri()),
    );
    let chat = h.service(Arc::new(client), Duration::from_secs(5));

    let conversation = chat.start_conversation(&h.user, None).await.unwrap();
    let mut settings = chat.settings_for(&h.user).await.unwrap();
    settings.api_key = "sk-mock".to_string();

    let exchange = chat
        .send(&conversation.id, "Hi", None, &settings)
        .await
        .unwrap();
    assert_eq!(exchange.assistant.content, "Hello from the mock!");

    let listed = h.store.list_conversations(&h.user).await.unwrap();
    assert_eq!(listed[0].messages.len(), 2);
}
