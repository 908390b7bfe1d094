use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use tokio::task;
use tracing::{debug, info};

use crate::config::SecurityConfig;
use crate::db::timestamp_now;
use crate::domain::{User, UserId};
use crate::entities::{prelude::*, users};

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: UserId::from(model.id),
            email: model.email,
            username: model.username,
        }
    }
}

/// Outcome of checking a password against the stored hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordCheck {
    NoSuchUser,
    Mismatch,
    Valid(User),
}

/// Key used for uniqueness and lookups: surrounding whitespace and case are ignored.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn find_model_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        Users::find()
            .filter(users::Column::EmailNormalized.eq(normalize_email(email)))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")
    }

    /// Hashes the password and inserts the user. `None` means the email is taken.
    pub async fn create(
        &self,
        email: &str,
        username: Option<&str>,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<Option<UserId>> {
        if self.find_model_by_email(email).await?.is_some() {
            debug!("Registration rejected, email already in use");
            return Ok(None);
        }

        let password = password.to_string();
        let config = security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .context("Password hashing task panicked")??;

        let id = UserId::generate();
        let active = users::ActiveModel {
            id: Set(id.to_string()),
            email: Set(email.trim().to_string()),
            email_normalized: Set(normalize_email(email)),
            username: Set(username.map(ToString::to_string)),
            password_hash: Set(password_hash),
            created_at: Set(timestamp_now()),
            last_login: Set(None),
        };

        // The lookup above can race another registration; the unique index settles it
        match Users::insert(active).exec_without_returning(&self.conn).await {
            Ok(_) => {}
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Ok(None);
            }
            Err(e) => return Err(e).context("Failed to insert user"),
        }

        info!(user_id = %id, "Registered new user");
        Ok(Some(id))
    }

    /// Checks the password against the stored hash on a blocking worker.
    pub async fn verify_password(&self, email: &str, password: &str) -> Result<PasswordCheck> {
        let Some(user) = self.find_model_by_email(email).await? else {
            return Ok(PasswordCheck::NoSuchUser);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .context("Password verification task panicked")??;

        if is_valid {
            Ok(PasswordCheck::Valid(User::from(user)))
        } else {
            Ok(PasswordCheck::Mismatch)
        }
    }

    pub async fn record_login(&self, id: &UserId) -> Result<()> {
        let user = Users::find_by_id(id.as_str())
            .one(&self.conn)
            .await
            .context("Failed to query user for login update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = user.into();
        active.last_login = Set(Some(timestamp_now()));
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn last_login(&self, id: &UserId) -> Result<Option<String>> {
        let user = Users::find_by_id(id.as_str())
            .one(&self.conn)
            .await
            .context("Failed to query user for last login")?;

        Ok(user.and_then(|u| u.last_login))
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Checks `password` against a PHC-format hash. Params come from the hash itself.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
