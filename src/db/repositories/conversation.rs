use crate::db::timestamp_now;
use crate::domain::{Conversation, ConversationId, Message, MessageId, NewMessage, Role, UserId};
use crate::entities::{conversations, messages, prelude::*};
use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Repository for conversations and their messages
pub struct ConversationRepository {
    conn: DatabaseConnection,
}

impl ConversationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    // ========================================================================
    // Model Conversion Helpers
    // ========================================================================

    fn map_message_model(m: messages::Model) -> Result<Message> {
        let role: Role = m
            .role
            .parse()
            .with_context(|| format!("Corrupt role on message {}", m.id))?;
        let tokens = u32::try_from(m.tokens)
            .with_context(|| format!("Corrupt token count on message {}", m.id))?;

        Ok(Message {
            id: MessageId::from(m.id),
            conversation_id: ConversationId::from(m.conversation_id),
            role,
            content: m.content,
            attachment: m.attachment,
            tokens,
            created_at: m.created_at,
        })
    }

    fn map_conversation_model(c: conversations::Model, messages: Vec<Message>) -> Conversation {
        Conversation {
            id: ConversationId::from(c.id),
            user_id: UserId::from(c.user_id),
            title: c.title,
            messages,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }

    /// Messages of every listed conversation, each group in append order.
    async fn load_messages(&self, ids: &[String]) -> Result<HashMap<String, Vec<Message>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Messages::find()
            .filter(messages::Column::ConversationId.is_in(ids.iter().cloned()))
            .order_by_asc(messages::Column::ConversationId)
            .order_by_asc(messages::Column::Seq)
            .all(&self.conn)
            .await
            .context("Failed to load messages")?;

        let mut grouped: HashMap<String, Vec<Message>> = HashMap::new();
        for row in rows {
            let key = row.conversation_id.clone();
            grouped
                .entry(key)
                .or_default()
                .push(Self::map_message_model(row)?);
        }

        Ok(grouped)
    }

    // ========================================================================
    // Conversation Operations
    // ========================================================================

    pub async fn create(&self, user_id: &UserId, title: &str) -> Result<Option<Conversation>> {
        let owner = Users::find_by_id(user_id.as_str())
            .one(&self.conn)
            .await
            .context("Failed to look up conversation owner")?;
        if owner.is_none() {
            return Ok(None);
        }

        let id = ConversationId::generate();
        let now = timestamp_now();

        Conversations::insert(conversations::ActiveModel {
            id: Set(id.to_string()),
            user_id: Set(user_id.to_string()),
            title: Set(title.to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to insert conversation")?;

        info!(conversation_id = %id, user_id = %user_id, "Created conversation");

        Ok(Some(Conversation {
            id,
            user_id: user_id.clone(),
            title: title.to_string(),
            messages: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }))
    }

    pub async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        let Some(row) = Conversations::find_by_id(id.as_str())
            .one(&self.conn)
            .await
            .context("Failed to query conversation")?
        else {
            return Ok(None);
        };

        let mut messages = self.load_messages(&[row.id.clone()]).await?;
        let messages = messages.remove(&row.id).unwrap_or_default();

        Ok(Some(Self::map_conversation_model(row, messages)))
    }

    /// Most recently updated first, each with its full message history.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Conversation>> {
        let rows = Conversations::find()
            .filter(conversations::Column::UserId.eq(user_id.as_str()))
            .order_by_desc(conversations::Column::UpdatedAt)
            .order_by_desc(conversations::Column::CreatedAt)
            .order_by_asc(conversations::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list conversations")?;

        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut messages = self.load_messages(&ids).await?;

        let conversations: Vec<Conversation> = rows
            .into_iter()
            .map(|row| {
                let msgs = messages.remove(&row.id).unwrap_or_default();
                Self::map_conversation_model(row, msgs)
            })
            .collect();

        debug!(
            user_id = %user_id,
            count = conversations.len(),
            "Loaded conversations"
        );
        Ok(conversations)
    }

    /// Appends after the current last message and bumps `updated_at`.
    ///
    /// The bump is the first statement of the transaction, so the write lock is
    /// taken up front and concurrent appends to one conversation serialize instead
    /// of racing for the same `seq`.
    pub async fn append_message(
        &self,
        conversation_id: &ConversationId,
        message: NewMessage,
    ) -> Result<Option<Message>> {
        let txn = self.conn.begin().await?;
        let now = timestamp_now();

        let touched = Conversations::update_many()
            .col_expr(conversations::Column::UpdatedAt, Expr::value(now.clone()))
            .filter(conversations::Column::Id.eq(conversation_id.as_str()))
            .exec(&txn)
            .await
            .context("Failed to touch conversation")?;

        if touched.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let last_seq: Option<i64> = Messages::find()
            .select_only()
            .column_as(messages::Column::Seq.max(), "max_seq")
            .filter(messages::Column::ConversationId.eq(conversation_id.as_str()))
            .into_tuple::<Option<i64>>()
            .one(&txn)
            .await
            .context("Failed to read last message position")?
            .flatten();
        let seq = last_seq.unwrap_or(0) + 1;

        let id = MessageId::generate();
        Messages::insert(messages::ActiveModel {
            id: Set(id.to_string()),
            conversation_id: Set(conversation_id.to_string()),
            seq: Set(seq),
            role: Set(message.role.as_str().to_string()),
            content: Set(message.content.clone()),
            attachment: Set(message.attachment.clone()),
            tokens: Set(i64::from(message.tokens)),
            created_at: Set(now.clone()),
        })
        .exec_without_returning(&txn)
        .await
        .context("Failed to insert message")?;

        txn.commit().await?;

        debug!(
            conversation_id = %conversation_id,
            seq,
            role = %message.role,
            "Appended message"
        );

        Ok(Some(Message {
            id,
            conversation_id: conversation_id.clone(),
            role: message.role,
            content: message.content,
            attachment: message.attachment,
            tokens: message.tokens,
            created_at: now,
        }))
    }

    pub async fn rename(&self, id: &ConversationId, title: &str) -> Result<bool> {
        let result = Conversations::update_many()
            .col_expr(conversations::Column::Title, Expr::value(title))
            .col_expr(conversations::Column::UpdatedAt, Expr::value(timestamp_now()))
            .filter(conversations::Column::Id.eq(id.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to rename conversation")?;

        Ok(result.rows_affected > 0)
    }

    /// Removes messages, then the conversation, in one transaction.
    /// Returns whether the conversation existed.
    pub async fn delete(&self, id: &ConversationId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let removed_messages = Messages::delete_many()
            .filter(messages::Column::ConversationId.eq(id.as_str()))
            .exec(&txn)
            .await
            .context("Failed to delete messages")?;

        let removed = Conversations::delete_by_id(id.as_str())
            .exec(&txn)
            .await
            .context("Failed to delete conversation")?;

        txn.commit().await?;

        if removed.rows_affected > 0 {
            info!(
                conversation_id = %id,
                messages = removed_messages.rows_affected,
                "Deleted conversation"
            );
        }

        Ok(removed.rows_affected > 0)
    }

    pub async fn count_messages(&self, conversation_id: &ConversationId) -> Result<u64> {
        let count = Messages::find()
            .filter(messages::Column::ConversationId.eq(conversation_id.as_str()))
            .count(&self.conn)
            .await?;

        Ok(count)
    }
}
