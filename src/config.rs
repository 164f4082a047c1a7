//! Configuration management
//!
//! Loads configuration from config.toml with support for:
//! - Server binding settings
//! - Storage backend selection (memory or SQLite)
//! - Telegram bot credentials
//! - Notification retry policy
//!
//! Environment variables override file values: `HOST`, `PORT`, `ADBOUNTY_DB`,
//! `BOT_TOKEN`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::notify::RetryPolicy;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub bounties: BountyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database file, used by the sqlite backend
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: "adbounty.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    crate::telegram::DEFAULT_API_BASE.to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub queue_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 500,
            queue_capacity: 1024,
        }
    }
}

impl NotificationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BountyConfig {
    pub default_deadline_days: i64,
}

impl Default for BountyConfig {
    fn default() -> Self {
        Self {
            default_deadline_days: crate::ledger::DEFAULT_DEADLINE_DAYS,
        }
    }
}

impl Config {
    /// Load from a file (embedded defaults when it does not exist), then apply
    /// environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            toml::from_str(DEFAULT_CONFIG).context("Failed to parse default config")?
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = var("HOST").filter(|v| !v.is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = var("PORT").filter(|v| !v.is_empty()) {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", port))?;
        }
        if let Some(db) = var("ADBOUNTY_DB").filter(|v| !v.is_empty()) {
            self.storage.backend = StorageBackend::Sqlite;
            self.storage.path = db;
        }
        if let Some(token) = var("BOT_TOKEN").filter(|v| !v.is_empty()) {
            self.telegram.bot_token = token;
        }
        Ok(())
    }

    /// Bot token, if one is configured
    pub fn bot_token(&self) -> Option<&str> {
        if self.telegram.bot_token.is_empty() {
            None
        } else {
            Some(&self.telegram.bot_token)
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        // The embedded default config is validated by tests,
        // so this should never fail.
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            storage: StorageConfig::default(),
            telegram: TelegramConfig::default(),
            notifications: NotificationConfig::default(),
            bounties: BountyConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_embedded_default_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.bounties.default_deadline_days, 7);
        assert!(config.bot_token().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "9090"),
            ("ADBOUNTY_DB", "/tmp/ledger.db"),
            ("BOT_TOKEN", "123:abc"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:9090");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, "/tmp/ledger.db");
        assert_eq!(config.bot_token(), Some("123:abc"));
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let mut config = Config::default();
        assert!(config
            .apply_env(|k| (k == "PORT").then(|| "eighty".to_string()))
            .is_err());
    }

    #[test]
    fn test_minimal_file_uses_section_defaults() {
        let config: Config = toml::from_str("[server]\nhost = \"127.0.0.1\"\nport = 1\n").unwrap();
        assert_eq!(config.notifications.max_attempts, 3);
        assert_eq!(
            config.notifications.retry_policy().base_delay,
            Duration::from_millis(500)
        );
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_telegram_section_with_token_only() {
        let config: Config = toml::from_str(
            "[server]\nhost = \"127.0.0.1\"\nport = 1\n\n[telegram]\nbot_token = \"123:abc\"\n",
        )
        .unwrap();
        assert_eq!(config.bot_token(), Some("123:abc"));
        assert_eq!(config.telegram.api_base, crate::telegram::DEFAULT_API_BASE);
    }

    #[test]
    fn test_load_from_missing_file_uses_embedded_defaults() {
        let config = Config::load_from("/nonexistent/adbounty-config.toml").unwrap();
        assert_eq!(config.notifications.queue_capacity, 1024);
        assert_eq!(config.bounties.default_deadline_days, 7);
    }
}
