//! Domain types for users, conversations, messages and settings.
//!
//! Identifiers follow the newtype pattern so a `ConversationId` can never be
//! handed to an operation expecting a `UserId`. All identifiers are opaque
//! UUIDv4 strings generated on the client side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generates a fresh random (v4) identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// Unique identifier of a registered user.
    UserId
);

string_id!(
    /// Unique identifier of a conversation.
    ConversationId
);

string_id!(
    /// Unique identifier of a single message.
    MessageId
);

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Error,
    System,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Error => "error",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown message role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "error" => Ok(Self::Error),
            "system" => Ok(Self::System),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Minimal user record handed out after login. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: Option<String>,
}

/// A message about to be appended. The store assigns id, order and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    pub attachment: Option<String>,
    pub tokens: u32,
}

impl NewMessage {
    /// Builds a message whose token count is estimated from its content.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let content = content.into();
        let tokens = crate::tokens::estimate_tokens(&content);
        Self {
            role,
            content,
            attachment: None,
            tokens,
        }
    }

    #[must_use]
    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachment = Some(attachment.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub attachment: Option<String>,
    pub tokens: u32,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.messages.iter().map(|m| u64::from(m.tokens)).sum()
    }
}

/// Per-user generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub api_key: String,
    pub selected_model: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: &'static str,
        max: &'static str,
    },

    #[error("max_tokens must be a positive integer")]
    ZeroMaxTokens,

    #[error("Unknown setting: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl Settings {
    /// Checks the numeric ranges. The store itself accepts anything; callers that
    /// take user input are expected to run this first.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range("temperature", self.temperature, 0.0, 1.0, "0.0", "1.0")?;
        check_range("top_p", self.top_p, 0.0, 1.0, "0.0", "1.0")?;
        check_range(
            "frequency_penalty",
            self.frequency_penalty,
            0.0,
            2.0,
            "0.0",
            "2.0",
        )?;
        check_range(
            "presence_penalty",
            self.presence_penalty,
            0.0,
            2.0,
            "0.0",
            "2.0",
        )?;

        if self.max_tokens == 0 {
            return Err(SettingsError::ZeroMaxTokens);
        }

        Ok(())
    }

    /// Applies a single `key = value` change, as typed on the command line.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "api_key" => self.api_key = value.to_string(),
            "selected_model" | "model" => self.selected_model = value.to_string(),
            "system_prompt" => self.system_prompt = value.to_string(),
            "temperature" => self.temperature = value.parse().map_err(|_| invalid())?,
            "max_tokens" => self.max_tokens = value.parse().map_err(|_| invalid())?,
            "top_p" => self.top_p = value.parse().map_err(|_| invalid())?,
            "frequency_penalty" => {
                self.frequency_penalty = value.parse().map_err(|_| invalid())?;
            }
            "presence_penalty" => self.presence_penalty = value.parse().map_err(|_| invalid())?,
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }

        Ok(())
    }

    /// Everything except the API key.
    #[must_use]
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            model: self.selected_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
        }
    }

    /// API key with everything but the last four characters hidden.
    #[must_use]
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{tail}", "*".repeat(chars.len() - 4))
    }
}

fn check_range(
    field: &'static str,
    value: f64,
    lo: f64,
    hi: f64,
    min: &'static str,
    max: &'static str,
) -> Result<(), SettingsError> {
    if value.is_nan() || value < lo || value > hi {
        return Err(SettingsError::OutOfRange { field, min, max });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_settings() -> Settings {
        Settings {
            api_key: "sk-test-abcdef".to_string(),
            selected_model: "gpt-3.5-turbo".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            temperature: 0.7,
            max_tokens: 150,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }

    #[test]
    fn ids_are_unique_and_display_raw() {
        let a = ConversationId::generate();
        let b = ConversationId::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.as_str());
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn role_parses_known_values_only() {
        for role in [Role::User, Role::Assistant, Role::Error, Role::System] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(
            "moderator".parse::<Role>(),
            Err(UnknownRole("moderator".to_string()))
        );
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn validate_accepts_bounds() {
        let mut s = sample_settings();
        s.temperature = 1.0;
        s.top_p = 0.0;
        s.frequency_penalty = 2.0;
        s.presence_penalty = 2.0;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let mut s = sample_settings();
        s.presence_penalty = 2.5;
        assert!(matches!(
            s.validate(),
            Err(SettingsError::OutOfRange {
                field: "presence_penalty",
                ..
            })
        ));

        let mut s = sample_settings();
        s.max_tokens = 0;
        assert_eq!(s.validate(), Err(SettingsError::ZeroMaxTokens));

        let mut s = sample_settings();
        s.temperature = f64::NAN;
        assert!(s.validate().is_err());
    }

    #[test]
    fn set_field_parses_numbers() {
        let mut s = sample_settings();
        s.set_field("temperature", "0.3").unwrap();
        s.set_field("max_tokens", "512").unwrap();
        s.set_field("model", "gpt-4o").unwrap();
        assert!((s.temperature - 0.3).abs() < f64::EPSILON);
        assert_eq!(s.max_tokens, 512);
        assert_eq!(s.selected_model, "gpt-4o");

        assert!(matches!(
            s.set_field("max_tokens", "-1"),
            Err(SettingsError::InvalidValue { .. })
        ));
        assert!(matches!(
            s.set_field("colour", "blue"),
            Err(SettingsError::UnknownKey(_))
        ));
    }

    #[test]
    fn generation_params_drop_api_key() {
        let params = sample_settings().generation_params();
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("sk-test"));
        assert_eq!(params.model, "gpt-3.5-turbo");
    }

    #[test]
    fn masked_api_key_keeps_tail() {
        assert_eq!(sample_settings().masked_api_key(), "**********cdef");
        let mut s = sample_settings();
        s.api_key = "abc".to_string();
        assert_eq!(s.masked_api_key(), "***");
    }
}
