//! Default value functions for configuration.

/// Database file used when no `[database]` section is given.
pub const DEFAULT_DATABASE_PATH: &str = "chanlink.db";

pub fn default_metrics_port() -> u16 {
    9090
}

/// Seconds an invite link stays usable before a new one is minted.
pub fn default_invite_link_expiry() -> u64 {
    300
}
