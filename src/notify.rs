//! User-facing notifications.
//!
//! Every failure a command can hit ends up here and is turned into one short,
//! transient message. Errors outside the known taxonomy are logged in full and
//! shown only as the generic message.

use crate::clients::CompletionError;
use crate::constants::notifications::{ERROR_DURATION, SUCCESS_DURATION, UNEXPECTED_ERROR};
use crate::domain::SettingsError;
use crate::services::{ChatError, StoreError};
use crate::session::NotSignedIn;
use std::fmt;
use std::time::Duration;
use tracing::error;

/// Input rejected by a command before any service was called.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct InvalidInput(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    pub duration: Duration,
}

impl Notification {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
            duration: SUCCESS_DURATION,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            duration: ERROR_DURATION,
        }
    }

    #[must_use]
    pub fn unexpected() -> Self {
        Self::error(UNEXPECTED_ERROR)
    }

    /// Maps any command failure to what the user sees.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        let known = if let Some(e) = err.downcast_ref::<ChatError>() {
            chat_message(e)
        } else if let Some(e) = err.downcast_ref::<StoreError>() {
            store_message(e)
        } else if let Some(e) = err.downcast_ref::<CompletionError>() {
            completion_message(e)
        } else if let Some(e) = err.downcast_ref::<SettingsError>() {
            Some(e.to_string())
        } else if let Some(e) = err.downcast_ref::<NotSignedIn>() {
            Some(e.to_string())
        } else if let Some(e) = err.downcast_ref::<InvalidInput>() {
            Some(e.to_string())
        } else {
            None
        };

        known.map_or_else(
            || {
                error!("Unexpected error: {err:#}");
                Self::unexpected()
            },
            Self::error,
        )
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.level {
            Level::Success => "✓",
            Level::Error => "✗",
        };
        write!(f, "{marker} {}", self.message)
    }
}

fn store_message(err: &StoreError) -> Option<String> {
    let message = match err {
        StoreError::DuplicateUser => "An account with this email already exists".to_string(),
        StoreError::UserNotFound => "User not found".to_string(),
        StoreError::InvalidCredentials => "Invalid password".to_string(),
        StoreError::ConversationNotFound(id) => format!("Conversation not found: {id}"),
        StoreError::StorageUnavailable(_) => {
            "Local storage is unavailable. Check the database path and try again.".to_string()
        }
        StoreError::Storage(_) => return None,
    };
    Some(message)
}

fn completion_message(err: &CompletionError) -> Option<String> {
    let message = match err {
        CompletionError::Auth(detail) => {
            format!("The completion service rejected the API key: {detail}")
        }
        CompletionError::RateLimited {
            retry_after_seconds: Some(secs),
        } => format!("Rate limit reached. Try again in {secs} seconds."),
        CompletionError::RateLimited {
            retry_after_seconds: None,
        } => "Rate limit reached. Please wait a moment and try again.".to_string(),
        CompletionError::Network(_) => {
            "Could not reach the completion service. Check your connection.".to_string()
        }
        CompletionError::Unexpected(_) => return None,
    };
    Some(message)
}

fn chat_message(err: &ChatError) -> Option<String> {
    match err {
        ChatError::Store(e) => store_message(e),
        ChatError::Completion(e) => completion_message(e),
        ChatError::Timeout(_) => Some(
            "The completion service took too long to respond. Please try again.".to_string(),
        ),
        ChatError::EmptyMessage => Some(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConversationId;

    #[test]
    fn success_and_error_durations() {
        let ok = Notification::success("Saved");
        assert_eq!(ok.level, Level::Success);
        assert_eq!(ok.duration, Duration::from_millis(3000));
        assert_eq!(ok.to_string(), "✓ Saved");

        let err = Notification::error("Nope");
        assert_eq!(err.level, Level::Error);
        assert_eq!(err.duration, Duration::from_millis(5000));
        assert_eq!(err.to_string(), "✗ Nope");
    }

    #[test]
    fn store_errors_map_to_specific_messages() {
        let cases = [
            (StoreError::UserNotFound, "User not found"),
            (StoreError::InvalidCredentials, "Invalid password"),
            (
                StoreError::DuplicateUser,
                "An account with this email already exists",
            ),
        ];

        for (err, expected) in cases {
            let n = Notification::from_error(&err.into());
            assert_eq!(n.level, Level::Error);
            assert_eq!(n.message, expected);
        }

        let n = Notification::from_error(
            &StoreError::ConversationNotFound(ConversationId::from("c-1")).into(),
        );
        assert_eq!(n.message, "Conversation not found: c-1");

        let n =
            Notification::from_error(&StoreError::StorageUnavailable("locked".to_string()).into());
        assert!(n.message.starts_with("Local storage is unavailable"));
    }

    #[test]
    fn raw_storage_failures_are_generic() {
        let n = Notification::from_error(&StoreError::Storage("disk I/O error".to_string()).into());
        assert_eq!(n.message, UNEXPECTED_ERROR);
        assert_eq!(n.duration, ERROR_DURATION);
    }

    #[test]
    fn completion_errors_through_chat_error() {
        let n = Notification::from_error(
            &ChatError::Completion(CompletionError::RateLimited {
                retry_after_seconds: Some(12),
            })
            .into(),
        );
        assert_eq!(n.message, "Rate limit reached. Try again in 12 seconds.");

        let n = Notification::from_error(
            &ChatError::Completion(CompletionError::Network("refused".to_string())).into(),
        );
        assert!(n.message.starts_with("Could not reach"));

        let n = Notification::from_error(
            &CompletionError::Auth("Incorrect API key provided".to_string()).into(),
        );
        assert!(n.message.ends_with("Incorrect API key provided"));

        let n = Notification::from_error(
            &ChatError::Completion(CompletionError::Unexpected("500".to_string())).into(),
        );
        assert_eq!(n.message, UNEXPECTED_ERROR);
    }

    #[test]
    fn timeout_reads_like_a_network_failure() {
        let n = Notification::from_error(&ChatError::Timeout(Duration::from_secs(60)).into());
        assert_eq!(n.level, Level::Error);
        assert!(n.message.contains("too long"));
    }

    #[test]
    fn validation_and_session_errors_pass_through() {
        let n = Notification::from_error(&SettingsError::ZeroMaxTokens.into());
        assert_eq!(n.message, "max_tokens must be a positive integer");

        let n = Notification::from_error(&NotSignedIn.into());
        assert!(n.message.starts_with("You are not signed in"));

        let n = Notification::from_error(&InvalidInput("Password cannot be empty".into()).into());
        assert_eq!(n.message, "Password cannot be empty");
    }

    #[test]
    fn unknown_errors_become_generic() {
        let n = Notification::from_error(&anyhow::anyhow!("something odd"));
        assert_eq!(n.message, UNEXPECTED_ERROR);
    }
}
