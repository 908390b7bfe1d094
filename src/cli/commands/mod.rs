mod auth;
mod conversations;
mod init;
mod models;
mod send;
mod settings;

pub use auth::{cmd_login, cmd_logout, cmd_register, cmd_whoami};
pub use conversations::{cmd_delete, cmd_list, cmd_new, cmd_rename, cmd_show};
pub use init::cmd_init;
pub use models::cmd_models;
pub use send::cmd_send;
pub use settings::{cmd_settings_set, cmd_settings_show};

use crate::domain::{Conversation, ConversationId, User};
use crate::services::StoreError;
use crate::state::AppState;

/// Loads a conversation the signed-in user owns. Someone else's conversation
/// is reported the same way as a missing one.
async fn owned_conversation(
    state: &AppState,
    user: &User,
    id: &str,
) -> anyhow::Result<Conversation> {
    let id = ConversationId::from(id.trim());

    match state.store.get_conversation(&id).await? {
        Some(conversation) if conversation.user_id == user.id => Ok(conversation),
        _ => Err(StoreError::ConversationNotFound(id).into()),
    }
}

/// `2024-05-01T09:30:12.123456Z` as `2024-05-01 09:30`, local time.
fn format_timestamp(ts: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(ts).map_or_else(
        |_| ts.to_string(),
        |dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}

/// First line of `text`, cut to `max` characters.
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() > max {
        let cut: String = line.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}
