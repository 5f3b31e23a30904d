//! Channel addressing and force-subscription gate.
//!
//! Every store failure here is logged and turned into a negative result
//! (`None`, `false`, empty); only malformed operator input is reported as an
//! error. Callers that need to see store failures use the repositories on
//! [`Gate::db`] directly.

use super::traits::MembershipProbe;
use crate::config::Config;
use crate::db::{Database, FsubMode, InviteLink, LinkKind, ModeSummary, ModeUpdate};
use crate::error::{ChannelId, Degrade, GateResult};
use crate::telemetry::spans;
use std::fmt;
use std::time::Duration;
use tracing::{Instrument, debug, info, warn};

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The user may access content.
    Cleared,
    /// The user is banned.
    Banned { reason: String },
    /// The user still has to join (or request to join) these channels.
    MustJoin(Vec<i64>),
}

impl AccessDecision {
    pub fn is_cleared(&self) -> bool {
        matches!(self, Self::Cleared)
    }

    /// Metrics label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cleared => "cleared",
            Self::Banned { .. } => "banned",
            Self::MustJoin(_) => "must_join",
        }
    }
}

/// Where a channel is known, for operator diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    pub channel_id: i64,
    pub in_link_registry: bool,
    pub in_fsub: bool,
    pub mode: FsubMode,
    pub pending_requests: u64,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |b: bool| if b { "yes" } else { "no" };
        write!(
            f,
            "Channel {}: link={} fsub={} mode={} pending={}",
            self.channel_id,
            mark(self.in_link_registry),
            mark(self.in_fsub),
            self.mode,
            self.pending_requests
        )
    }
}

/// The gate service.
#[derive(Clone)]
pub struct Gate {
    db: Database,
    bot_username: String,
    owner_id: i64,
    invite_link_expiry: Duration,
}

impl Gate {
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            db,
            bot_username: config.bot.username.clone(),
            owner_id: config.bot.owner_id,
            invite_link_expiry: config.links.invite_link_expiry(),
        }
    }

    /// The underlying store, for callers that want raw results.
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ========================================================================
    // Link registry
    // ========================================================================

    /// Register a channel for link generation from operator input.
    ///
    /// Returns the primary token, or `None` if the store write failed.
    pub async fn register_channel(&self, raw: &str) -> GateResult<Option<String>> {
        let channel_id: i64 = raw.parse::<ChannelId>()?.into();

        let token = self
            .db
            .links()
            .register(channel_id)
            .instrument(spans::channel_op("register", Some(channel_id)))
            .await
            .map(Some)
            .or_degrade_write("register", format_args!("register channel {channel_id}"), None);
        Ok(token)
    }

    /// Remove a channel from the link registry. The fsub registry is untouched.
    pub async fn unregister_channel(&self, channel_id: i64) -> bool {
        self.db
            .links()
            .unregister(channel_id)
            .instrument(spans::channel_op("unregister", Some(channel_id)))
            .await
            .or_degrade_write(
                "unregister",
                format_args!("unregister channel {channel_id}"),
                false,
            )
    }

    /// Channels available for link generation.
    pub async fn link_channels(&self) -> Vec<i64> {
        self.db
            .links()
            .list_active()
            .await
            .or_degrade("list_link_channels", Vec::new())
    }

    /// Resolve a share-link token to a channel id.
    pub async fn resolve(&self, token: &str, kind: LinkKind) -> Option<i64> {
        let resolved = self
            .db
            .links()
            .resolve(token, kind)
            .instrument(spans::resolve(kind.label()))
            .await
            .or_degrade("resolve", None);

        if resolved.is_none() {
            debug!(token = %token, kind = kind.label(), "Token did not resolve");
        }
        resolved
    }

    /// Share URL for a channel, built from its stored token.
    pub async fn share_url(&self, channel_id: i64, kind: LinkKind) -> Option<String> {
        let links = self.db.links();
        let token = match kind {
            LinkKind::Primary => links.primary_token(channel_id).await,
            LinkKind::Secondary => links.secondary_token(channel_id).await,
        }
        .or_degrade("share_url", None)?;

        Some(format!("https://t.me/{}?start={}", self.bot_username, token))
    }

    /// Remember the invite link just minted for a channel.
    pub async fn store_invite_link(&self, channel_id: i64, link: &str, is_request: bool) -> bool {
        self.db
            .links()
            .set_invite_link(channel_id, link, is_request)
            .await
            .map(|()| true)
            .or_degrade_write(
                "set_invite_link",
                format_args!("set invite link of {channel_id} to {link}"),
                false,
            )
    }

    /// The stored invite link, unless it is older than the configured expiry.
    pub async fn fresh_invite_link(&self, channel_id: i64) -> Option<InviteLink> {
        let invite = self
            .db
            .links()
            .get_invite_link(channel_id)
            .await
            .or_degrade("get_invite_link", None)?;

        let now = chrono::Utc::now().timestamp();
        if invite.is_stale(now, self.invite_link_expiry.as_secs()) {
            debug!(channel_id, "Stored invite link is stale");
            return None;
        }
        Some(invite)
    }

    // ========================================================================
    // FSub registry
    // ========================================================================

    /// Add a channel to the fsub registry from operator input.
    ///
    /// `Ok(true)` only when the channel was not there before.
    pub async fn add_fsub_channel(&self, raw: &str) -> GateResult<bool> {
        let channel_id: i64 = raw.parse::<ChannelId>()?.into();

        Ok(self
            .db
            .fsub()
            .add_channel(channel_id)
            .instrument(spans::channel_op("add_fsub", Some(channel_id)))
            .await
            .or_degrade_write("add_fsub", format_args!("add fsub channel {channel_id}"), false))
    }

    /// Remove a channel from the fsub registry. The link registry is untouched.
    pub async fn remove_fsub_channel(&self, channel_id: i64) -> bool {
        self.db
            .fsub()
            .remove_channel(channel_id)
            .instrument(spans::channel_op("remove_fsub", Some(channel_id)))
            .await
            .or_degrade_write(
                "remove_fsub",
                format_args!("remove fsub channel {channel_id}"),
                false,
            )
    }

    /// Channels subject to force-subscription.
    pub async fn fsub_channels(&self) -> Vec<i64> {
        self.db
            .fsub()
            .list_active()
            .await
            .or_degrade("list_fsub_channels", Vec::new())
    }

    /// Set one channel's mode from operator input.
    pub async fn set_mode(&self, channel_id: i64, raw_mode: &str) -> GateResult<bool> {
        let mode: FsubMode = raw_mode.parse()?;

        Ok(self
            .db
            .fsub()
            .set_mode(channel_id, mode)
            .instrument(spans::channel_op("set_mode", Some(channel_id)))
            .await
            .map(|()| true)
            .or_degrade_write(
                "set_mode",
                format_args!("set mode of {channel_id} to {mode}"),
                false,
            ))
    }

    /// Set every active channel's mode from operator input.
    ///
    /// A mode other than `on`/`off` is rejected before any write.
    pub async fn set_mode_all(&self, raw_mode: &str) -> GateResult<ModeUpdate> {
        let mode: FsubMode = raw_mode.parse()?;

        let update = self
            .db
            .fsub()
            .set_mode_all(mode)
            .instrument(spans::channel_op("set_mode_all", None))
            .await
            .or_degrade_write(
                "set_mode_all",
                format_args!("set mode of all channels to {mode}"),
                ModeUpdate::default(),
            );
        Ok(update)
    }

    pub async fn mode_summary(&self) -> ModeSummary {
        self.db
            .fsub()
            .mode_summary()
            .await
            .or_degrade("mode_summary", ModeSummary::default())
    }

    // ========================================================================
    // Join-request ledger
    // ========================================================================

    /// Note that a user asked to join a channel.
    pub async fn record_join_request(&self, channel_id: i64, user_id: i64) {
        self.db
            .join_requests()
            .add_pending(channel_id, user_id)
            .await
            .map(|_| ())
            .or_degrade_write(
                "add_pending",
                format_args!("add pending request of {user_id} for {channel_id}"),
                (),
            );
    }

    /// Forget a user's join request (approved, declined, or withdrawn).
    pub async fn clear_join_request(&self, channel_id: i64, user_id: i64) {
        self.db
            .join_requests()
            .remove_pending(channel_id, user_id)
            .await
            .map(|_| ())
            .or_degrade_write(
                "remove_pending",
                format_args!("remove pending request of {user_id} for {channel_id}"),
                (),
            );
    }

    pub async fn has_pending_request(&self, channel_id: i64, user_id: i64) -> bool {
        self.db
            .join_requests()
            .is_pending(channel_id, user_id)
            .await
            .or_degrade("is_pending", false)
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Whether the user is the owner or a stored admin.
    pub async fn is_admin(&self, user_id: i64) -> bool {
        if user_id == self.owner_id {
            return true;
        }
        self.db
            .admins()
            .is_admin(user_id)
            .await
            .or_degrade("is_admin", false)
    }

    /// Decide whether a user may access gated content.
    ///
    /// Admins are always cleared. Banned users are refused while the ban
    /// lasts. Otherwise each active fsub channel in mode `on` must be
    /// satisfied, either by a pending join request or by membership as
    /// reported by `probe`. A probe failure counts as "not a member".
    pub async fn check_access(&self, user_id: i64, probe: &dyn MembershipProbe) -> AccessDecision {
        let decision = self
            .decide(user_id, probe)
            .instrument(spans::access_check(user_id))
            .await;

        crate::metrics::record_gate_decision(decision.label());
        decision
    }

    async fn decide(&self, user_id: i64, probe: &dyn MembershipProbe) -> AccessDecision {
        if self.is_admin(user_id).await {
            return AccessDecision::Cleared;
        }

        let ban = self
            .db
            .bans()
            .ban_status(user_id)
            .await
            .or_degrade("ban_status", None);
        if let Some(ban) = ban
            && !ban.is_expired(chrono::Utc::now().date_naive())
        {
            info!(user_id, reason = %ban.ban_reason, "Access refused: user banned");
            return AccessDecision::Banned {
                reason: ban.ban_reason,
            };
        }

        let enforced = self
            .db
            .fsub()
            .list_enforced()
            .await
            .or_degrade("list_enforced", Vec::new());

        let mut missing = Vec::new();
        for channel_id in enforced {
            if self.has_pending_request(channel_id, user_id).await {
                continue;
            }
            match probe.is_member(channel_id, user_id).await {
                Ok(true) => {}
                Ok(false) => missing.push(channel_id),
                Err(e) => {
                    warn!(channel_id, user_id, error = %e, "Membership probe failed");
                    missing.push(channel_id);
                }
            }
        }

        if missing.is_empty() {
            AccessDecision::Cleared
        } else {
            debug!(user_id, missing = missing.len(), "User must join channels");
            AccessDecision::MustJoin(missing)
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Where a channel is registered, its mode and pending request count.
    pub async fn channel_status(&self, channel_id: i64) -> ChannelStatus {
        let in_link_registry = self
            .db
            .links()
            .is_active(channel_id)
            .await
            .or_degrade("channel_status", false);
        let fsub = self.db.fsub();
        let in_fsub = fsub.is_member(channel_id).await.or_degrade("channel_status", false);
        let mode = fsub
            .get_mode(channel_id)
            .await
            .or_degrade("channel_status", FsubMode::Off);
        let pending_requests = self
            .db
            .join_requests()
            .pending_count(channel_id)
            .await
            .or_degrade("channel_status", 0);

        ChannelStatus {
            channel_id,
            in_link_registry,
            in_fsub,
            mode,
            pending_requests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::services::ProbeError;
    use async_trait::async_trait;
    use std::collections::HashSet;

    const OWNER: i64 = 1;

    /// Probe answering from a fixed member list; channels in `broken` fail.
    #[derive(Default)]
    struct StaticProbe {
        members: HashSet<(i64, i64)>,
        broken: HashSet<i64>,
    }

    #[async_trait]
    impl MembershipProbe for StaticProbe {
        async fn is_member(&self, channel_id: i64, user_id: i64) -> Result<bool, ProbeError> {
            if self.broken.contains(&channel_id) {
                return Err(ProbeError("transport timeout".into()));
            }
            Ok(self.members.contains(&(channel_id, user_id)))
        }
    }

    async fn gate() -> Gate {
        let config = Config::parse("[bot]\nusername = \"testbot\"\nowner_id = 1\n").unwrap();
        Gate::new(Database::connect(":memory:").await.unwrap(), &config)
    }

    #[tokio::test]
    async fn test_register_rejects_non_integer() {
        let gate = gate().await;
        let err = gate.register_channel("not-a-channel").await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_input");
        assert!(gate.link_channels().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_and_share() {
        let gate = gate().await;
        let token = gate.register_channel("-1001234567890").await.unwrap().unwrap();

        assert_eq!(
            gate.share_url(-1001234567890, LinkKind::Primary).await.unwrap(),
            format!("https://t.me/testbot?start={token}")
        );
        assert_eq!(gate.resolve(&token, LinkKind::Primary).await, Some(-1001234567890));
        assert!(gate.share_url(-42, LinkKind::Secondary).await.is_none());
    }

    #[tokio::test]
    async fn test_set_mode_all_rejects_bogus_mode() {
        let gate = gate().await;
        gate.add_fsub_channel("-1001").await.unwrap();

        assert!(gate.set_mode_all("bogus").await.is_err());
        assert_eq!(gate.mode_summary().await.on_count, 0);

        for raw in ["ON", " on", "Off"] {
            let err = gate.set_mode_all(raw).await.unwrap_err();
            assert_eq!(err.error_code(), "invalid_input");
        }
        assert_eq!(
            gate.mode_summary().await.channels,
            vec![(-1001, FsubMode::Off)]
        );

        let update = gate.set_mode_all("on").await.unwrap();
        assert_eq!(update.matched, 1);
        assert_eq!(gate.mode_summary().await.on_count, 1);
    }

    #[tokio::test]
    async fn test_set_mode_rejects_bogus_mode() {
        let gate = gate().await;
        assert!(gate.set_mode(-1001, "maybe").await.is_err());
        assert!(gate.set_mode(-1001, "on").await.unwrap());
    }

    #[tokio::test]
    async fn test_access_with_no_enforced_channels() {
        let gate = gate().await;
        gate.add_fsub_channel("-1001").await.unwrap();

        // Registered but mode off: not gated.
        let decision = gate.check_access(50, &StaticProbe::default()).await;
        assert!(decision.is_cleared());
    }

    #[tokio::test]
    async fn test_access_requires_membership_or_request() {
        let gate = gate().await;
        for id in ["-1001", "-1002", "-1003"] {
            gate.add_fsub_channel(id).await.unwrap();
        }
        gate.set_mode(-1001, "on").await.unwrap();
        gate.set_mode(-1002, "on").await.unwrap();

        let mut probe = StaticProbe::default();
        assert_eq!(
            gate.check_access(50, &probe).await,
            AccessDecision::MustJoin(vec![-1001, -1002])
        );

        probe.members.insert((-1001, 50));
        gate.record_join_request(-1002, 50).await;
        assert_eq!(gate.check_access(50, &probe).await, AccessDecision::Cleared);

        gate.clear_join_request(-1002, 50).await;
        assert_eq!(
            gate.check_access(50, &probe).await,
            AccessDecision::MustJoin(vec![-1002])
        );
    }

    #[tokio::test]
    async fn test_probe_failure_counts_as_not_member() {
        let gate = gate().await;
        gate.add_fsub_channel("-1001").await.unwrap();
        gate.set_mode(-1001, "on").await.unwrap();

        let mut probe = StaticProbe::default();
        probe.members.insert((-1001, 50));
        probe.broken.insert(-1001);

        assert_eq!(
            gate.check_access(50, &probe).await,
            AccessDecision::MustJoin(vec![-1001])
        );
    }

    #[tokio::test]
    async fn test_admins_and_owner_bypass_gate() {
        let gate = gate().await;
        gate.add_fsub_channel("-1001").await.unwrap();
        gate.set_mode_all("on").await.unwrap();
        gate.db().admins().add_admin(77).await.unwrap();

        let probe = StaticProbe::default();
        assert!(gate.check_access(OWNER, &probe).await.is_cleared());
        assert!(gate.check_access(77, &probe).await.is_cleared());
        assert!(!gate.check_access(78, &probe).await.is_cleared());
    }

    #[tokio::test]
    async fn test_banned_user_refused() {
        let gate = gate().await;
        gate.db().bans().ban_user(66, 0, "abuse").await.unwrap();

        assert_eq!(
            gate.check_access(66, &StaticProbe::default()).await,
            AccessDecision::Banned {
                reason: "abuse".into()
            }
        );
    }

    #[tokio::test]
    async fn test_ban_beyond_calendar_range_holds() {
        let gate = gate().await;
        gate.db().bans().ban_user(9, 1_000_000_000, "flood").await.unwrap();
        gate.db().bans().ban_user(10, u32::MAX, "flood").await.unwrap();

        for user in [9, 10] {
            assert_eq!(
                gate.check_access(user, &StaticProbe::default()).await,
                AccessDecision::Banned {
                    reason: "flood".into()
                }
            );
        }
    }

    #[tokio::test]
    async fn test_fresh_invite_link() {
        let gate = gate().await;
        assert!(gate.fresh_invite_link(-1001).await.is_none());

        assert!(gate.store_invite_link(-1001, "https://t.me/+abc", true).await);
        let invite = gate.fresh_invite_link(-1001).await.unwrap();
        assert_eq!(invite.link, "https://t.me/+abc");
        assert!(invite.is_request);
    }

    #[tokio::test]
    async fn test_channel_status() {
        let gate = gate().await;
        gate.register_channel("-1001").await.unwrap();
        gate.record_join_request(-1001, 5).await;

        let status = gate.channel_status(-1001).await;
        assert!(status.in_link_registry);
        assert!(!status.in_fsub);
        assert_eq!(status.mode, FsubMode::Off);
        assert_eq!(status.pending_requests, 1);
        assert_eq!(
            status.to_string(),
            "Channel -1001: link=yes fsub=no mode=off pending=1"
        );
    }

    #[tokio::test]
    async fn test_store_failures_degrade() {
        let gate = gate().await;
        let token = gate.register_channel("-1001").await.unwrap().unwrap();
        gate.db().close().await;

        assert_eq!(gate.register_channel("-1002").await.unwrap(), None);
        assert_eq!(gate.resolve(&token, LinkKind::Primary).await, None);
        assert!(gate.link_channels().await.is_empty());
        assert!(!gate.has_pending_request(-1001, 5).await);
        gate.record_join_request(-1001, 5).await;
        gate.clear_join_request(-1001, 5).await;
        assert_eq!(gate.set_mode_all("on").await.unwrap(), ModeUpdate::default());
        assert!(!gate.remove_fsub_channel(-1001).await);

        // Input validation still runs first.
        assert!(gate.register_channel("x").await.is_err());
        assert_eq!(codec::decode(&token).unwrap(), -1001);
    }
}
