//! Link registry queries.

use super::models::{ChannelLinkRecord, InviteLink, LinkKind};
use crate::codec;
use crate::db::{DbError, RecordStatus, now};
use crate::telemetry::StoreTimer;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

const TABLE: &str = "link_channels";

type LinkRow = (
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
    Option<i64>,
    Option<String>,
    String,
    i64,
    Option<i64>,
);

/// Repository for link registry operations.
pub struct LinkRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LinkRepository<'a> {
    /// Create a new link repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a channel for link generation and return its primary token.
    ///
    /// Both tokens start out as `encode(channel_id)`. Re-registering keeps an
    /// existing secondary token and only refreshes `updated_at`.
    pub async fn register(&self, channel_id: i64) -> Result<String, DbError> {
        let _timer = StoreTimer::new(TABLE, "register");
        let token = codec::encode(channel_id);
        let ts = now();

        sqlx::query(
            r#"
            INSERT INTO link_channels (channel_id, encoded_link, req_encoded_link, status, created_at)
            VALUES (?, ?, ?, 'active', ?)
            ON CONFLICT(channel_id) DO UPDATE SET
                encoded_link = excluded.encoded_link,
                req_encoded_link = COALESCE(link_channels.req_encoded_link, excluded.req_encoded_link),
                status = 'active',
                updated_at = ?
            "#,
        )
        .bind(channel_id)
        .bind(&token)
        .bind(&token)
        .bind(ts)
        .bind(ts)
        .execute(self.pool)
        .await?;

        info!(channel_id, token = %token, "Channel registered for link generation");
        Ok(token)
    }

    /// Remove a channel's record. Returns whether a record existed.
    pub async fn unregister(&self, channel_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "unregister");
        let result = sqlx::query("DELETE FROM link_channels WHERE channel_id = ?")
            .bind(channel_id)
            .execute(self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!(channel_id, "Channel removed from link registry");
        } else {
            warn!(channel_id, "Channel not found in link registry");
        }
        Ok(removed)
    }

    /// Soft-delete a channel. Returns whether an active record was flipped.
    pub async fn deactivate(&self, channel_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "deactivate");
        let result = sqlx::query(
            "UPDATE link_channels SET status = 'inactive', updated_at = ? WHERE channel_id = ? AND status = 'active'",
        )
        .bind(now())
        .bind(channel_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All active channel ids, in insertion order.
    pub async fn list_active(&self) -> Result<Vec<i64>, DbError> {
        let _timer = StoreTimer::new(TABLE, "list_active");
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT channel_id FROM link_channels WHERE status = 'active' ORDER BY seq",
        )
        .fetch_all(self.pool)
        .await?;

        debug!(count = ids.len(), "Listed active link channels");
        Ok(ids)
    }

    /// Whether the channel has an active record.
    pub async fn is_active(&self, channel_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "is_active");
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM link_channels WHERE channel_id = ? AND status = 'active'",
        )
        .bind(channel_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(found.is_some())
    }

    /// Fetch a channel's record regardless of status.
    pub async fn find(&self, channel_id: i64) -> Result<Option<ChannelLinkRecord>, DbError> {
        let _timer = StoreTimer::new(TABLE, "find");
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT channel_id, encoded_link, req_encoded_link, current_invite_link, is_request_link,
                   invite_link_created_at, original_link, status, created_at, updated_at
            FROM link_channels
            WHERE channel_id = ?
            "#,
        )
        .bind(channel_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    /// Stored primary token of an active channel.
    pub async fn primary_token(&self, channel_id: i64) -> Result<Option<String>, DbError> {
        self.active_token(channel_id, LinkKind::Primary).await
    }

    /// Stored secondary token of an active channel.
    pub async fn secondary_token(&self, channel_id: i64) -> Result<Option<String>, DbError> {
        self.active_token(channel_id, LinkKind::Secondary).await
    }

    async fn active_token(&self, channel_id: i64, kind: LinkKind) -> Result<Option<String>, DbError> {
        let _timer = StoreTimer::new(TABLE, "get_token");
        let query = format!(
            "SELECT {} FROM link_channels WHERE channel_id = ? AND status = 'active'",
            kind.column()
        );

        let token = sqlx::query_scalar::<_, Option<String>>(&query)
            .bind(channel_id)
            .fetch_optional(self.pool)
            .await?
            .flatten();

        if token.is_none() {
            debug!(channel_id, kind = kind.label(), "No stored token for channel");
        }
        Ok(token)
    }

    /// Write the canonical primary token for a channel and return it.
    pub async fn save_primary_token(&self, channel_id: i64) -> Result<String, DbError> {
        let token = codec::encode(channel_id);
        self.save_token(channel_id, LinkKind::Primary, &token).await?;
        Ok(token)
    }

    /// Overwrite a channel's secondary token.
    pub async fn save_secondary_token(&self, channel_id: i64, token: &str) -> Result<(), DbError> {
        self.save_token(channel_id, LinkKind::Secondary, token).await
    }

    async fn save_token(&self, channel_id: i64, kind: LinkKind, token: &str) -> Result<(), DbError> {
        let _timer = StoreTimer::new(TABLE, "save_token");
        let ts = now();
        let column = kind.column();
        let query = format!(
            r#"
            INSERT INTO link_channels (channel_id, {column}, status, created_at, updated_at)
            VALUES (?, ?, 'active', ?, ?)
            ON CONFLICT(channel_id) DO UPDATE SET
                {column} = excluded.{column},
                status = 'active',
                updated_at = excluded.updated_at
            "#
        );

        sqlx::query(&query)
            .bind(channel_id)
            .bind(token)
            .bind(ts)
            .bind(ts)
            .execute(self.pool)
            .await?;

        info!(channel_id, kind = kind.label(), token = %token, "Saved channel token");
        Ok(())
    }

    /// Resolve a primary token to its channel id.
    pub async fn resolve_primary(&self, token: &str) -> Result<Option<i64>, DbError> {
        self.resolve(token, LinkKind::Primary).await
    }

    /// Resolve a secondary token to its channel id.
    pub async fn resolve_secondary(&self, token: &str) -> Result<Option<i64>, DbError> {
        self.resolve(token, LinkKind::Secondary).await
    }

    /// Resolve a token to its channel id, healing the registry on the way.
    ///
    /// Lookup order:
    /// 1. exact match on the stored token of an active record;
    /// 2. decode the token; if a record for that id exists (any status) the
    ///    token is written into it and the record re-activated;
    /// 3. otherwise a fresh record is created, with the given token in the
    ///    requested field and the canonical token in the other.
    ///
    /// Undecodable tokens resolve to `None`. Steps 2 and 3 write.
    pub async fn resolve(&self, token: &str, kind: LinkKind) -> Result<Option<i64>, DbError> {
        let _timer = StoreTimer::new(TABLE, "resolve");
        let column = kind.column();

        let stored = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT channel_id FROM link_channels WHERE {column} = ? AND status = 'active' ORDER BY seq LIMIT 1"
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        if let Some(channel_id) = stored {
            crate::metrics::record_resolution(kind.label(), "stored");
            return Ok(Some(channel_id));
        }

        let channel_id = match codec::decode(token) {
            Ok(id) => id,
            Err(e) => {
                debug!(token = %token, error = %e, "Token did not decode");
                crate::metrics::record_resolution(kind.label(), "miss");
                return Ok(None);
            }
        };

        let ts = now();
        let healed = sqlx::query(&format!(
            "UPDATE link_channels SET {column} = ?, status = 'active', updated_at = ? WHERE channel_id = ?"
        ))
        .bind(token)
        .bind(ts)
        .bind(channel_id)
        .execute(self.pool)
        .await?;

        if healed.rows_affected() > 0 {
            debug!(channel_id, kind = kind.label(), "Healed stored token from decoded id");
            crate::metrics::record_resolution(kind.label(), "healed");
            return Ok(Some(channel_id));
        }

        // A concurrent first-sight resolve may win the insert; the upsert keeps
        // this safe with last-write-wins on the token columns.
        let other = kind.other().column();
        sqlx::query(&format!(
            r#"
            INSERT INTO link_channels (channel_id, {column}, {other}, status, created_at)
            VALUES (?, ?, ?, 'active', ?)
            ON CONFLICT(channel_id) DO UPDATE SET
                {column} = excluded.{column},
                status = 'active',
                updated_at = excluded.created_at
            "#
        ))
        .bind(channel_id)
        .bind(token)
        .bind(codec::encode(channel_id))
        .bind(ts)
        .execute(self.pool)
        .await?;

        info!(channel_id, kind = kind.label(), "Created link record on first sight of token");
        crate::metrics::record_resolution(kind.label(), "created");
        Ok(Some(channel_id))
    }

    /// Replace the channel's current invite link.
    pub async fn set_invite_link(
        &self,
        channel_id: i64,
        link: &str,
        is_request: bool,
    ) -> Result<(), DbError> {
        let _timer = StoreTimer::new(TABLE, "set_invite_link");
        let ts = now();

        sqlx::query(
            r#"
            INSERT INTO link_channels (channel_id, current_invite_link, is_request_link, invite_link_created_at, status, created_at)
            VALUES (?, ?, ?, ?, 'active', ?)
            ON CONFLICT(channel_id) DO UPDATE SET
                current_invite_link = excluded.current_invite_link,
                is_request_link = excluded.is_request_link,
                invite_link_created_at = excluded.invite_link_created_at,
                status = 'active'
            "#,
        )
        .bind(channel_id)
        .bind(link)
        .bind(is_request)
        .bind(ts)
        .bind(ts)
        .execute(self.pool)
        .await?;

        debug!(channel_id, is_request, "Stored current invite link");
        Ok(())
    }

    /// Current invite link of an active channel.
    pub async fn get_invite_link(&self, channel_id: i64) -> Result<Option<InviteLink>, DbError> {
        let _timer = StoreTimer::new(TABLE, "get_invite_link");
        let row = sqlx::query_as::<_, (String, bool, Option<i64>)>(
            r#"
            SELECT current_invite_link, is_request_link, invite_link_created_at
            FROM link_channels
            WHERE channel_id = ? AND status = 'active' AND current_invite_link IS NOT NULL
            "#,
        )
        .bind(channel_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(link, is_request, created_at)| InviteLink {
            link,
            is_request,
            created_at,
        }))
    }

    /// Store the channel's original public link.
    pub async fn set_original_link(&self, channel_id: i64, link: &str) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "set_original_link");
        let result = sqlx::query(
            "UPDATE link_channels SET original_link = ?, updated_at = ? WHERE channel_id = ?",
        )
        .bind(link)
        .bind(now())
        .bind(channel_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Original public link of an active channel.
    pub async fn original_link(&self, channel_id: i64) -> Result<Option<String>, DbError> {
        let _timer = StoreTimer::new(TABLE, "original_link");
        let link = sqlx::query_scalar::<_, Option<String>>(
            "SELECT original_link FROM link_channels WHERE channel_id = ? AND status = 'active'",
        )
        .bind(channel_id)
        .fetch_optional(self.pool)
        .await?
        .flatten();

        Ok(link)
    }
}

fn record_from_row(row: LinkRow) -> Result<ChannelLinkRecord, DbError> {
    let (
        channel_id,
        encoded_link,
        req_encoded_link,
        current_invite_link,
        is_request_link,
        invite_link_created_at,
        original_link,
        status,
        created_at,
        updated_at,
    ) = row;

    Ok(ChannelLinkRecord {
        channel_id,
        encoded_link,
        req_encoded_link,
        current_invite_link,
        is_request_link,
        invite_link_created_at,
        original_link,
        status: status.parse::<RecordStatus>()?,
        created_at,
        updated_at,
    })
}
