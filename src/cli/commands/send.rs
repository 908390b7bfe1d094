//! Send command handler

use super::owned_conversation;
use crate::domain::{Conversation, User};
use crate::notify::InvalidInput;
use crate::state::AppState;
use std::path::Path;
use tracing::info;

/// The named conversation, else the most recently updated one, else a new one.
async fn target_conversation(
    state: &AppState,
    user: &User,
    id: Option<&str>,
) -> anyhow::Result<Conversation> {
    if let Some(id) = id {
        return owned_conversation(state, user, id).await;
    }

    let latest = state
        .store
        .list_conversations(&user.id)
        .await?
        .into_iter()
        .next();

    match latest {
        Some(conversation) => Ok(conversation),
        None => Ok(state.chat.start_conversation(&user.id, None).await?),
    }
}

fn attachment_name(path: &Path) -> anyhow::Result<String> {
    if !path.is_file() {
        return Err(InvalidInput(format!("Attachment not found: {}", path.display())).into());
    }

    Ok(path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()))
}

pub async fn cmd_send(
    state: &AppState,
    conversation: Option<&str>,
    attach: Option<&Path>,
    message: &[String],
) -> anyhow::Result<()> {
    let user = state.session.require()?;
    let settings = state.chat.settings_for(&user.id).await?;
    let attachment = attach.map(attachment_name).transpose()?;

    let conversation = target_conversation(state, &user, conversation).await?;
    let content = message.join(" ");

    tokio::select! {
        result = state.chat.send(&conversation.id, &content, attachment, &settings) => {
            let exchange = result?;
            println!("{}", exchange.assistant.content);
            println!();
            println!(
                "[{} | ~{} tokens]",
                conversation.title,
                exchange.user.tokens + exchange.assistant.tokens
            );
        }
        _ = tokio::signal::ctrl_c() => {
            info!(conversation_id = %conversation.id, "Send cancelled by user");
            println!("Cancelled. Your message was kept; no reply was saved.");
        }
    }

    Ok(())
}
