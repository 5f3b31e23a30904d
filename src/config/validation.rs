//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bot.username is required")]
    MissingUsername,
    #[error("bot.username must not start with '@', got '{0}'")]
    UsernameHasAt(String),
    #[error("bot.owner_id must be positive, got {0}")]
    InvalidOwnerId(i64),
    #[error("links.invite_link_expiry_secs must be greater than zero")]
    ZeroInviteExpiry,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let username = &config.bot.username;
    if username.is_empty() {
        errors.push(ValidationError::MissingUsername);
    } else if username.starts_with('@') {
        errors.push(ValidationError::UsernameHasAt(username.clone()));
    }

    if config.bot.owner_id <= 0 {
        errors.push(ValidationError::InvalidOwnerId(config.bot.owner_id));
    }

    if config.links.invite_link_expiry_secs == 0 {
        errors.push(ValidationError::ZeroInviteExpiry);
    }

    if let Some(ref db) = config.database {
        let db_path = Path::new(&db.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(db.path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
