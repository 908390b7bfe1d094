use crate::db::timestamp_now;
use crate::domain::{Settings, UserId};
use crate::entities::settings;
use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, EntityTrait, Set, SqlErr, sea_query::OnConflict};

pub struct SettingsRepository {
    conn: DatabaseConnection,
}

impl SettingsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: settings::Model) -> Result<Settings> {
        let max_tokens = u32::try_from(m.max_tokens)
            .with_context(|| format!("Corrupt max_tokens for user {}", m.user_id))?;

        Ok(Settings {
            api_key: m.api_key,
            selected_model: m.selected_model,
            system_prompt: m.system_prompt,
            temperature: m.temperature,
            max_tokens,
            top_p: m.top_p,
            frequency_penalty: m.frequency_penalty,
            presence_penalty: m.presence_penalty,
        })
    }

    pub async fn get(&self, user_id: &UserId) -> Result<Option<Settings>> {
        let row = settings::Entity::find_by_id(user_id.as_str())
            .one(&self.conn)
            .await
            .context("Failed to query settings")?;

        row.map(Self::map_model).transpose()
    }

    /// Insert or overwrite the single row for `user_id`. Values are stored as given.
    /// Returns `false` when no such user exists.
    pub async fn upsert(&self, user_id: &UserId, s: &Settings) -> Result<bool> {
        let active = settings::ActiveModel {
            user_id: Set(user_id.to_string()),
            api_key: Set(s.api_key.clone()),
            selected_model: Set(s.selected_model.clone()),
            system_prompt: Set(s.system_prompt.clone()),
            temperature: Set(s.temperature),
            max_tokens: Set(i64::from(s.max_tokens)),
            top_p: Set(s.top_p),
            frequency_penalty: Set(s.frequency_penalty),
            presence_penalty: Set(s.presence_penalty),
            updated_at: Set(timestamp_now()),
        };

        let result = settings::Entity::insert(active)
            .on_conflict(
                OnConflict::column(settings::Column::UserId)
                    .update_columns([
                        settings::Column::ApiKey,
                        settings::Column::SelectedModel,
                        settings::Column::SystemPrompt,
                        settings::Column::Temperature,
                        settings::Column::MaxTokens,
                        settings::Column::TopP,
                        settings::Column::FrequencyPenalty,
                        settings::Column::PresencePenalty,
                        settings::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) => {
                Ok(false)
            }
            Err(e) => Err(e).context("Failed to save settings"),
        }
    }
}
