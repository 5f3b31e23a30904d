//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, BotConfig, DatabaseConfig)
//! - [`links`]: Share-link and invite-link settings (LinksConfig)
//! - [`validation`]: Startup validation of a loaded config

mod defaults;
mod links;
mod types;
pub mod validation;

pub use links::LinksConfig;
pub use types::{BotConfig, Config, ConfigError, DatabaseConfig};
pub use validation::{ValidationError, validate};
