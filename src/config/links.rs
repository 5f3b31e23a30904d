//! Share-link and invite-link configuration.

use serde::Deserialize;
use std::time::Duration;

use super::defaults::default_invite_link_expiry;

/// `[links]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    /// Age in seconds after which a stored invite link is considered stale.
    #[serde(default = "default_invite_link_expiry")]
    pub invite_link_expiry_secs: u64,
}

impl LinksConfig {
    pub fn invite_link_expiry(&self) -> Duration {
        Duration::from_secs(self.invite_link_expiry_secs)
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            invite_link_expiry_secs: default_invite_link_expiry(),
        }
    }
}
