//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::defaults::{DEFAULT_DATABASE_PATH, default_metrics_port};
use super::links::LinksConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bot identity.
    pub bot: BotConfig,
    /// Database configuration.
    pub database: Option<DatabaseConfig>,
    /// Share-link settings.
    #[serde(default)]
    pub links: LinksConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Database path, falling back to `chanlink.db`.
    pub fn database_path(&self) -> &str {
        self.database
            .as_ref()
            .map(|d| d.path.as_str())
            .unwrap_or(DEFAULT_DATABASE_PATH)
    }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Bot username without the leading `@`, used in share URLs.
    pub username: String,
    /// Owner user id. Always treated as an admin.
    pub owner_id: i64,
    /// Prometheus metrics HTTP port (default: 9090, 0 disables).
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [bot]
            username = "Link_sharex_vbot"
            owner_id = 7660990923
            "#,
        )
        .unwrap();

        assert_eq!(config.bot.metrics_port, 9090);
        assert_eq!(config.database_path(), "chanlink.db");
        assert_eq!(config.links.invite_link_expiry_secs, 300);
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [bot]
            username = "mybot"
            owner_id = 1
            metrics_port = 0

            [database]
            path = "/var/lib/chanlink/store.db"

            [links]
            invite_link_expiry_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.bot.metrics_port, 0);
        assert_eq!(config.database_path(), "/var/lib/chanlink/store.db");
        assert_eq!(config.links.invite_link_expiry().as_secs(), 600);
    }

    #[test]
    fn test_missing_bot_section_fails() {
        assert!(matches!(
            Config::parse("[database]\npath = \"x.db\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/chanlink.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
