//! Conversation command handlers

use super::{format_timestamp, owned_conversation, preview};
use crate::constants::limits::PREVIEW_CHARS;
use crate::domain::Role;
use crate::notify::Notification;
use crate::state::AppState;
use std::io::BufRead;

pub async fn cmd_new(state: &AppState, title: &[String]) -> anyhow::Result<()> {
    let user = state.session.require()?;
    let title = title.join(" ");

    let conversation = state
        .chat
        .start_conversation(&user.id, Some(title.as_str()))
        .await?;

    println!(
        "{}",
        Notification::success(format!("Created '{}'", conversation.title))
    );
    println!("  ID: {}", conversation.id);
    Ok(())
}

pub async fn cmd_list(state: &AppState) -> anyhow::Result<()> {
    let user = state.session.require()?;
    let conversations = state.store.list_conversations(&user.id).await?;

    if conversations.is_empty() {
        println!("No conversations yet.");
        println!();
        println!("Start one with: chatkeep send \"Hello\"");
        return Ok(());
    }

    println!("Conversations ({} total)", conversations.len());
    println!("{:-<70}", "");

    for conversation in &conversations {
        println!(
            "{} [{} messages, ~{} tokens]",
            conversation.title,
            conversation.messages.len(),
            conversation.total_tokens()
        );
        println!(
            "  ID: {} | Updated: {}",
            conversation.id,
            format_timestamp(&conversation.updated_at)
        );
        if let Some(last) = conversation.messages.last() {
            println!("  {}: {}", last.role, preview(&last.content, PREVIEW_CHARS));
        }
    }

    Ok(())
}

pub async fn cmd_show(state: &AppState, id: &str) -> anyhow::Result<()> {
    let user = state.session.require()?;
    let conversation = owned_conversation(state, &user, id).await?;

    println!("{}", conversation.title);
    println!(
        "Created: {} | Updated: {} | ~{} tokens",
        format_timestamp(&conversation.created_at),
        format_timestamp(&conversation.updated_at),
        conversation.total_tokens()
    );
    println!("{:-<70}", "");

    if conversation.messages.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    for message in &conversation.messages {
        let label = match message.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
            Role::System => "System",
            Role::Error => "Error",
        };
        println!("{label} ({}):", format_timestamp(&message.created_at));
        println!("{}", message.content);
        if let Some(attachment) = &message.attachment {
            println!("  📎 {attachment}");
        }
        println!();
    }

    Ok(())
}

pub async fn cmd_rename(state: &AppState, id: &str, title: &[String]) -> anyhow::Result<()> {
    let user = state.session.require()?;
    let conversation = owned_conversation(state, &user, id).await?;

    state
        .chat
        .rename_conversation(&conversation.id, &title.join(" "))
        .await?;

    println!("{}", Notification::success("Conversation renamed"));
    Ok(())
}

pub async fn cmd_delete(state: &AppState, id: &str, yes: bool) -> anyhow::Result<()> {
    let user = state.session.require()?;
    let conversation = owned_conversation(state, &user, id).await?;

    if !yes {
        println!(
            "Delete '{}' and its {} messages?",
            conversation.title,
            conversation.messages.len()
        );
        println!("Enter 'y' to confirm, anything else to cancel:");

        let mut input = String::new();
        std::io::stdin().lock().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    state.store.delete_conversation(&conversation.id).await?;

    println!(
        "{}",
        Notification::success(format!("Deleted: {}", conversation.title))
    );
    Ok(())
}
