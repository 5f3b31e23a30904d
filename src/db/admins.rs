//! Admin repository.

use super::{DbError, now};
use crate::telemetry::StoreTimer;
use sqlx::SqlitePool;
use tracing::info;

const TABLE: &str = "admins";

/// Repository for admin operations.
pub struct AdminRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AdminRepository<'a> {
    /// Create a new admin repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Grant admin rights. Re-adding refreshes `added_at`.
    pub async fn add_admin(&self, user_id: i64) -> Result<(), DbError> {
        let _timer = StoreTimer::new(TABLE, "add_admin");
        sqlx::query(
            r#"
            INSERT INTO admins (user_id, added_at) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET added_at = excluded.added_at
            "#,
        )
        .bind(user_id)
        .bind(now())
        .execute(self.pool)
        .await?;

        info!(user_id, "Admin added");
        Ok(())
    }

    /// Revoke admin rights. Returns whether the user was an admin.
    pub async fn remove_admin(&self, user_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "remove_admin");
        let result = sqlx::query("DELETE FROM admins WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!(user_id, "Admin removed");
        }
        Ok(removed)
    }

    pub async fn is_admin(&self, user_id: i64) -> Result<bool, DbError> {
        let _timer = StoreTimer::new(TABLE, "is_admin");
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM admins WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// All admin ids, oldest grant first.
    pub async fn list_admins(&self) -> Result<Vec<i64>, DbError> {
        let _timer = StoreTimer::new(TABLE, "list_admins");
        let ids = sqlx::query_scalar::<_, i64>("SELECT user_id FROM admins ORDER BY added_at, user_id")
            .fetch_all(self.pool)
            .await?;
        Ok(ids)
    }
}
