use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::Settings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub security: SecurityConfig,

    pub completion: CompletionConfig,

    pub session: SessionConfig,

    /// Settings used for a user who has never saved their own.
    pub defaults: DefaultSettingsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 1)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        let database_path = dirs::data_dir().map_or_else(
            || "sqlite:data/chatkeep.db".to_string(),
            |dir| format!("sqlite:{}", dir.join("chatkeep").join("chatkeep.db").display()),
        );

        Self {
            database_path,
            log_level: "warn".to_string(),
            worker_threads: 1,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of an OpenAI-compatible API, without a trailing slash.
    pub base_url: String,

    /// Upper bound for a single completion or model listing (default: 60)
    pub request_timeout_seconds: u64,

    pub user_agent: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            request_timeout_seconds: 60,
            user_agent: format!("chatkeep/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the signed-in user record lives. Defaults to the data directory.
    pub path: Option<String>,
}

impl SessionConfig {
    #[must_use]
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return PathBuf::from(path);
        }

        dirs::data_dir().map_or_else(
            || PathBuf::from(crate::constants::session::FILE_NAME),
            |dir| dir.join("chatkeep").join(crate::constants::session::FILE_NAME),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSettingsConfig {
    pub selected_model: String,

    pub system_prompt: String,

    pub temperature: f64,

    pub max_tokens: u32,

    pub top_p: f64,

    pub frequency_penalty: f64,

    pub presence_penalty: f64,
}

impl Default for DefaultSettingsConfig {
    fn default() -> Self {
        Self {
            selected_model: "gpt-3.5-turbo".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            temperature: 0.7,
            max_tokens: 150,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

impl DefaultSettingsConfig {
    /// Builds a settings record with an empty API key.
    #[must_use]
    pub fn to_settings(&self) -> Settings {
        Settings {
            api_key: String::new(),
            selected_model: self.selected_model.clone(),
            system_prompt: self.system_prompt.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(Self::default_config_path());

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("chatkeep").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".chatkeep").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("chatkeep.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.completion.base_url.trim().is_empty() {
            anyhow::bail!("Completion base URL cannot be empty");
        }

        if self.completion.request_timeout_seconds == 0 {
            anyhow::bail!("Completion request timeout must be > 0");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("min_db_connections cannot exceed max_db_connections");
        }

        self.defaults
            .to_settings()
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid default settings: {e}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.defaults.selected_model, "gpt-3.5-turbo");
        assert_eq!(config.defaults.max_tokens, 150);
        assert_eq!(config.completion.base_url, "https://api.openai.com/v1");
        assert_eq!(config.security.argon2_time_cost, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[completion]"));
        assert!(toml_str.contains("[defaults]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [defaults]
            selected_model = "gpt-4o-mini"
            temperature = 0.2
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.defaults.selected_model, "gpt-4o-mini");
        assert!((config.defaults.temperature - 0.2).abs() < f64::EPSILON);

        assert_eq!(config.defaults.max_tokens, 150);
        assert_eq!(config.completion.request_timeout_seconds, 60);
    }

    #[test]
    fn test_validate_rejects_out_of_range_defaults() {
        let mut config = Config::default();
        config.defaults.top_p = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_path_override() {
        let session = SessionConfig {
            path: Some("/tmp/chatkeep-session.json".to_string()),
        };
        assert_eq!(
            session.resolve_path(),
            PathBuf::from("/tmp/chatkeep-session.json")
        );
    }
}
