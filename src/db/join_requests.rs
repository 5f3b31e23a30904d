//! Join-request ledger.
//!
//! Per channel, the set of users with a pending join request. Inserts and
//! removals are idempotent set operations keyed on `(channel_id, user_id)`.

use super::{DbError, now};
use crate::telemetry::StoreTimer;
use sqlx::SqlitePool;
use tracing::debug;

const TABLE: &str = "join_requests";

/// Repository for the join-request ledger.
pub struct JoinRequestRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JoinRequestRepository<'a> {
    /// Create a new join-request repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a pending request. Returns whether the entry is new.
    pub async fn add_pending(&self, channel_id: i64, user_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "add_pending");
        let result = sqlx::query(
            "INSERT OR IGNORE INTO join_requests (channel_id, user_id, requested_at) VALUES (?, ?, ?)",
        )
        .bind(channel_id)
        .bind(user_id)
        .bind(now())
        .execute(self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        debug!(channel_id, user_id, inserted, "Join request recorded");
        Ok(inserted)
    }

    /// Drop a pending request. Returns whether an entry was removed.
    pub async fn remove_pending(&self, channel_id: i64, user_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "remove_pending");
        let result = sqlx::query("DELETE FROM join_requests WHERE channel_id = ? AND user_id = ?")
            .bind(channel_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether the user has a pending request for the channel.
    pub async fn is_pending(&self, channel_id: i64, user_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "is_pending");
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM join_requests WHERE channel_id = ? AND user_id = ?",
        )
        .bind(channel_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(found.is_some())
    }

    /// Number of pending requests for a channel.
    pub async fn pending_count(&self, channel_id: i64) -> Result<u64, DbError> {
        let _timer = StoreTimer::new(TABLE, "pending_count");
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM join_requests WHERE channel_id = ?",
        )
        .bind(channel_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let db = Database::connect(":memory:").await.unwrap();
        let ledger = db.join_requests();

        assert!(ledger.add_pending(-1001, 7).await.unwrap());
        assert!(!ledger.add_pending(-1001, 7).await.unwrap());
        assert_eq!(ledger.pending_count(-1001).await.unwrap(), 1);

        assert!(ledger.remove_pending(-1001, 7).await.unwrap());
        assert!(!ledger.is_pending(-1001, 7).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let db = Database::connect(":memory:").await.unwrap();
        assert!(!db.join_requests().remove_pending(-1001, 7).await.unwrap());
    }

    #[tokio::test]
    async fn test_entries_are_per_channel() {
        let db = Database::connect(":memory:").await.unwrap();
        let ledger = db.join_requests();
        ledger.add_pending(-1001, 7).await.unwrap();
        ledger.add_pending(-1001, 8).await.unwrap();

        assert!(ledger.is_pending(-1001, 7).await.unwrap());
        assert!(!ledger.is_pending(-1002, 7).await.unwrap());
        assert_eq!(ledger.pending_count(-1001).await.unwrap(), 2);
        assert_eq!(ledger.pending_count(-1002).await.unwrap(), 0);
    }
}
