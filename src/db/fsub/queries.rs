//! FSub registry queries.

use super::models::{FsubChannelRecord, FsubMode, ModeSummary, ModeUpdate};
use crate::db::{DbError, RecordStatus, now};
use crate::telemetry::StoreTimer;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

const TABLE: &str = "fsub_channels";

/// Repository for fsub registry operations.
pub struct FsubRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FsubRepository<'a> {
    /// Create a new fsub repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Add a channel with mode `off`. Returns `true` only if no record matched.
    ///
    /// An existing record is still rewritten (active, mode reset to `off`).
    /// The return value comes from the update's matched count, so two racing
    /// adds can both report `true`.
    pub async fn add_channel(&self, channel_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "add_channel");
        let ts = now();

        let matched = sqlx::query(
            "UPDATE fsub_channels SET status = 'active', mode = 'off', updated_at = ? WHERE channel_id = ?",
        )
        .bind(ts)
        .bind(channel_id)
        .execute(self.pool)
        .await?
        .rows_affected();

        if matched > 0 {
            info!(channel_id, "Channel already in fsub registry");
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO fsub_channels (channel_id, status, mode, created_at)
            VALUES (?, 'active', 'off', ?)
            ON CONFLICT(channel_id) DO UPDATE SET
                status = 'active',
                mode = 'off',
                updated_at = excluded.created_at
            "#,
        )
        .bind(channel_id)
        .bind(ts)
        .execute(self.pool)
        .await?;

        info!(channel_id, "Channel added to fsub registry");
        Ok(true)
    }

    /// Delete a channel. Returns whether a record was removed.
    pub async fn remove_channel(&self, channel_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "remove_channel");
        let result = sqlx::query("DELETE FROM fsub_channels WHERE channel_id = ?")
            .bind(channel_id)
            .execute(self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!(channel_id, "Channel removed from fsub registry");
        } else {
            warn!(channel_id, "Channel not found in fsub registry");
        }
        Ok(removed)
    }

    /// All active channel ids, in insertion order.
    pub async fn list_active(&self) -> Result<Vec<i64>, DbError> {
        let _timer = StoreTimer::new(TABLE, "list_active");
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT channel_id FROM fsub_channels WHERE status = 'active' ORDER BY seq",
        )
        .fetch_all(self.pool)
        .await?;

        debug!(count = ids.len(), "Listed active fsub channels");
        Ok(ids)
    }

    /// Whether the channel is an active fsub channel.
    pub async fn is_member(&self, channel_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "is_member");
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM fsub_channels WHERE channel_id = ? AND status = 'active'",
        )
        .bind(channel_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(found.is_some())
    }

    /// Fetch a channel's record regardless of status.
    pub async fn find(&self, channel_id: i64) -> Result<Option<FsubChannelRecord>, DbError> {
        let _timer = StoreTimer::new(TABLE, "find");
        let row = sqlx::query_as::<_, (i64, String, String, Option<i64>, i64, Option<i64>)>(
            r#"
            SELECT channel_id, status, mode, mode_updated_at, created_at, updated_at
            FROM fsub_channels
            WHERE channel_id = ?
            "#,
        )
        .bind(channel_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(
            |(channel_id, status, mode, mode_updated_at, created_at, updated_at)| {
                Ok(FsubChannelRecord {
                    channel_id,
                    status: status.parse::<RecordStatus>()?,
                    mode: parse_stored_mode(&mode)?,
                    mode_updated_at,
                    created_at,
                    updated_at,
                })
            },
        )
        .transpose()
    }

    /// Mode of a channel; unknown channels are `off`.
    pub async fn get_mode(&self, channel_id: i64) -> Result<FsubMode, DbError> {
        let _timer = StoreTimer::new(TABLE, "get_mode");
        let mode = sqlx::query_scalar::<_, String>("SELECT mode FROM fsub_channels WHERE channel_id = ?")
            .bind(channel_id)
            .fetch_optional(self.pool)
            .await?;

        match mode {
            Some(mode) => parse_stored_mode(&mode),
            None => Ok(FsubMode::Off),
        }
    }

    /// Set a channel's mode.
    ///
    /// An unknown channel gets an inactive record holding only the mode; it
    /// does not become a member.
    pub async fn set_mode(&self, channel_id: i64, mode: FsubMode) -> Result<(), DbError> {
        let _timer = StoreTimer::new(TABLE, "set_mode");
        let ts = now();

        sqlx::query(
            r#"
            INSERT INTO fsub_channels (channel_id, status, mode, mode_updated_at, created_at)
            VALUES (?, 'inactive', ?, ?, ?)
            ON CONFLICT(channel_id) DO UPDATE SET
                mode = excluded.mode,
                mode_updated_at = excluded.mode_updated_at
            "#,
        )
        .bind(channel_id)
        .bind(mode.as_str())
        .bind(ts)
        .bind(ts)
        .execute(self.pool)
        .await?;

        info!(channel_id, mode = %mode, "Channel mode set");
        Ok(())
    }

    /// Set the mode of every active channel in one transaction.
    pub async fn set_mode_all(&self, mode: FsubMode) -> Result<ModeUpdate, DbError> {
        let _timer = StoreTimer::new(TABLE, "set_mode_all");
        let ts = now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE fsub_channels SET mode = ? WHERE status = 'active' AND mode <> ?",
        )
        .bind(mode.as_str())
        .bind(mode.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let matched = sqlx::query(
            "UPDATE fsub_channels SET mode_updated_at = ? WHERE status = 'active'",
        )
        .bind(ts)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        info!(mode = %mode, updated, matched, "Bulk mode update applied");
        Ok(ModeUpdate { updated, matched })
    }

    /// Mode overview of all active channels.
    pub async fn mode_summary(&self) -> Result<ModeSummary, DbError> {
        let _timer = StoreTimer::new(TABLE, "mode_summary");
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT channel_id, mode FROM fsub_channels WHERE status = 'active' ORDER BY seq",
        )
        .fetch_all(self.pool)
        .await?;

        let channels = rows
            .into_iter()
            .map(|(channel_id, mode)| Ok((channel_id, parse_stored_mode(&mode)?)))
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(ModeSummary::from_channels(channels))
    }

    /// Active channel ids whose mode is `on`, in insertion order.
    pub async fn list_enforced(&self) -> Result<Vec<i64>, DbError> {
        let _timer = StoreTimer::new(TABLE, "list_enforced");
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT channel_id FROM fsub_channels WHERE status = 'active' AND mode = 'on' ORDER BY seq",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }
}

fn parse_stored_mode(mode: &str) -> Result<FsubMode, DbError> {
    mode.parse::<FsubMode>()
        .map_err(|e| DbError::Integrity(e.to_string()))
}
