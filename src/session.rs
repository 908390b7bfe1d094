//! Signed-in user record persisted between invocations.
//!
//! The file holds the serialized [`User`] and nothing secret. Its presence is
//! what makes a session authenticated; `logout` deletes it.

use crate::config::Config;
use crate::domain::User;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
#[error("You are not signed in. Run `chatkeep login <email>` first.")]
pub struct NotSignedIn;

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.session.resolve_path())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The signed-in user, if any. An unreadable session file counts as signed out.
    pub fn load(&self) -> Result<Option<User>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file {}", self.path.display()))?;

        match serde_json::from_str::<User>(&content) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(
                    "Ignoring corrupt session file {}: {e}",
                    self.path.display()
                );
                Ok(None)
            }
        }
    }

    pub fn require(&self) -> Result<User> {
        self.load()?.ok_or_else(|| NotSignedIn.into())
    }

    pub fn save(&self, user: &User) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(user)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write session file {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace session file {}", self.path.display()))?;

        debug!(user_id = %user.id, "Session saved");
        Ok(())
    }

    /// Removes the session. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove session file {}", self.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    fn user() -> User {
        User {
            id: UserId::generate(),
            email: "Ada@Example.com".to_string(),
            username: Some("ada".to_string()),
        }
    }

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load().unwrap(), None);

        let user = user();
        store.save(&user).unwrap();
        assert_eq!(store.load().unwrap(), Some(user.clone()));
        assert_eq!(store.require().unwrap(), user);

        assert!(store.clear().unwrap());
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn require_without_session_is_not_signed_in() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let err = store.require().unwrap_err();
        assert!(err.downcast_ref::<NotSignedIn>().is_some());
    }

    #[test]
    fn corrupt_file_reads_as_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SessionStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn session_file_has_no_password_material() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&user()).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
        assert!(!raw.contains("password"));
    }
}
