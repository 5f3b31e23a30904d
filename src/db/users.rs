//! User repository.

use super::DbError;
use crate::telemetry::StoreTimer;
use sqlx::SqlitePool;
use tracing::{debug, info};

const TABLE: &str = "users";

/// A user who has interacted with the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: i64,
    /// Lower-cased username, if the user has one.
    pub username: Option<String>,
    /// ISO date of first contact.
    pub join_date: String,
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a user on first contact. Returns whether the user is new.
    pub async fn add_user(&self, user_id: i64, username: Option<&str>) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "add_user");
        let join_date = chrono::Utc::now().date_naive().to_string();

        let result = sqlx::query(
            "INSERT OR IGNORE INTO users (user_id, username, join_date) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(username.map(str::to_lowercase))
        .bind(join_date)
        .execute(self.pool)
        .await?;

        let added = result.rows_affected() > 0;
        if added {
            info!(user_id, "New user added");
        } else {
            debug!(user_id, "User already exists");
        }
        Ok(added)
    }

    /// Look up a user.
    pub async fn find(&self, user_id: i64) -> Result<Option<UserRecord>, DbError> {
        let _timer = StoreTimer::new(TABLE, "find");
        let row = sqlx::query_as::<_, (i64, Option<String>, String)>(
            "SELECT user_id, username, join_date FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(user_id, username, join_date)| UserRecord {
            user_id,
            username,
            join_date,
        }))
    }

    /// Whether the user is known.
    pub async fn user_exists(&self, user_id: i64) -> Result<bool, DbError> {
        Ok(self.find(user_id).await?.is_some())
    }

    /// All known user ids.
    pub async fn list_user_ids(&self) -> Result<Vec<i64>, DbError> {
        let _timer = StoreTimer::new(TABLE, "list_user_ids");
        let ids = sqlx::query_scalar::<_, i64>("SELECT user_id FROM users ORDER BY user_id")
            .fetch_all(self.pool)
            .await?;
        Ok(ids)
    }

    /// Number of known users.
    pub async fn total_users(&self) -> Result<u64, DbError> {
        let _timer = StoreTimer::new(TABLE, "total_users");
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Forget a user. Returns whether the user existed.
    pub async fn delete_user(&self, user_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "delete_user");
        let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
