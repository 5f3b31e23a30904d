//! Ban repository.
//!
//! A ban carries a duration in days counted from `banned_on`; a duration of
//! zero never expires.

use super::DbError;
use crate::telemetry::StoreTimer;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::info;

const TABLE: &str = "bans";

/// Ban state of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanStatus {
    pub is_banned: bool,
    /// Days, 0 for permanent.
    pub ban_duration: u32,
    pub banned_on: NaiveDate,
    pub ban_reason: String,
}

impl BanStatus {
    /// Whether the ban has run out on `today`.
    ///
    /// A duration reaching past the calendar range never expires.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        if self.ban_duration == 0 {
            return false;
        }
        self.banned_on
            .checked_add_days(chrono::Days::new(u64::from(self.ban_duration)))
            .is_some_and(|ends| today >= ends)
    }
}

/// Repository for ban operations.
pub struct BanRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BanRepository<'a> {
    /// Create a new ban repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Ban a user, replacing any earlier ban.
    pub async fn ban_user(
        &self,
        user_id: i64,
        duration_days: u32,
        reason: &str,
    ) -> Result<(), DbError> {
        let _timer = StoreTimer::new(TABLE, "ban_user");
        let today = chrono::Utc::now().date_naive().to_string();

        sqlx::query(
            r#"
            INSERT INTO bans (user_id, is_banned, ban_duration, banned_on, ban_reason)
            VALUES (?, 1, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                is_banned = 1,
                ban_duration = excluded.ban_duration,
                banned_on = excluded.banned_on,
                ban_reason = excluded.ban_reason
            "#,
        )
        .bind(user_id)
        .bind(i64::from(duration_days))
        .bind(today)
        .bind(reason)
        .execute(self.pool)
        .await?;

        info!(user_id, duration_days, reason = %reason, "User banned");
        Ok(())
    }

    /// Lift a ban. Returns whether the user was banned.
    pub async fn unban_user(&self, user_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "unban_user");
        let result = sqlx::query("DELETE FROM bans WHERE user_id = ? AND is_banned = 1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        let lifted = result.rows_affected() > 0;
        if lifted {
            info!(user_id, "User unbanned");
        }
        Ok(lifted)
    }

    /// Ban state of a user; `None` unless the user is currently flagged.
    pub async fn ban_status(&self, user_id: i64) -> Result<Option<BanStatus>, DbError> {
        let _timer = StoreTimer::new(TABLE, "ban_status");
        let row = sqlx::query_as::<_, (bool, i64, String, String)>(
            "SELECT is_banned, ban_duration, banned_on, ban_reason FROM bans WHERE user_id = ? AND is_banned = 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(|(is_banned, ban_duration, banned_on, ban_reason)| {
            let banned_on = banned_on
                .parse::<NaiveDate>()
                .map_err(|e| DbError::Integrity(format!("bad banned_on '{banned_on}': {e}")))?;
            Ok(BanStatus {
                is_banned,
                ban_duration: u32::try_from(ban_duration).unwrap_or(u32::MAX),
                banned_on,
                ban_reason,
            })
        })
        .transpose()
    }
}
