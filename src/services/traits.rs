use async_trait::async_trait;
use thiserror::Error;

/// A membership lookup that could not be answered.
#[derive(Debug, Error)]
#[error("membership probe failed: {0}")]
pub struct ProbeError(pub String);

/// Channel membership as seen by the messaging transport.
///
/// The gate never talks to the transport directly; the caller supplies an
/// implementation backed by whatever client it runs.
#[async_trait]
pub trait MembershipProbe: Send + Sync {
    /// Whether `user_id` is currently a member of `channel_id`.
    async fn is_member(&self, channel_id: i64, user_id: i64) -> Result<bool, ProbeError>;
}
