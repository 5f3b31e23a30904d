//! Link registry models.

use crate::db::RecordStatus;

/// A channel registered for link generation.
#[derive(Debug, Clone)]
pub struct ChannelLinkRecord {
    pub channel_id: i64,
    /// Primary token. `None` only for records created by a secondary-token write.
    pub encoded_link: Option<String>,
    /// Secondary ("request") token.
    pub req_encoded_link: Option<String>,
    pub current_invite_link: Option<String>,
    pub is_request_link: bool,
    pub invite_link_created_at: Option<i64>,
    pub original_link: Option<String>,
    pub status: RecordStatus,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl ChannelLinkRecord {
    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// Stored token for the given kind.
    pub fn token(&self, kind: LinkKind) -> Option<&str> {
        match kind {
            LinkKind::Primary => self.encoded_link.as_deref(),
            LinkKind::Secondary => self.req_encoded_link.as_deref(),
        }
    }
}

/// Which of the two stored tokens an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// `encoded_link`, used for plain share links.
    Primary,
    /// `req_encoded_link`, used for join-request share links.
    Secondary,
}

impl LinkKind {
    /// Column holding this token.
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Primary => "encoded_link",
            Self::Secondary => "req_encoded_link",
        }
    }

    /// The other token column.
    pub(crate) fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }

    /// Metrics label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "request",
        }
    }
}

/// The current invite link of a channel. Only one is tracked at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLink {
    pub link: String,
    pub is_request: bool,
    pub created_at: Option<i64>,
}

impl InviteLink {
    /// Whether the link is older than `ttl_secs` at `now`.
    ///
    /// A link without a creation time is treated as stale.
    pub fn is_stale(&self, now: i64, ttl_secs: u64) -> bool {
        match self.created_at {
            Some(created) => now.saturating_sub(created) >= i64::try_from(ttl_secs).unwrap_or(i64::MAX),
            None => true,
        }
    }
}
