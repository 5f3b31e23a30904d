//! Unified error handling for chanlink.
//!
//! Repository calls return [`DbError`](crate::db::DbError) so failures stay
//! inspectable. The gate layer converts them into degraded values through
//! [`Degrade`], logging the failed operation instead of propagating it.

use crate::db::DbError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

// ============================================================================
// Gate Errors
// ============================================================================

/// Errors surfaced by gate operations.
#[derive(Debug, Error)]
pub enum GateError {
    /// Rejected before any store call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] DbError),
}

impl GateError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Persistence(_) => "persistence_failure",
        }
    }
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;

// ============================================================================
// Boundary parsing
// ============================================================================

/// A channel identifier parsed from operator input.
///
/// Registries take raw `i64` ids; this type exists so text input is
/// validated before anything touches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub i64);

impl FromStr for ChannelId {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(ChannelId)
            .map_err(|_| GateError::InvalidInput(format!("channel id must be an integer, got '{s}'")))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ChannelId> for i64 {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

// ============================================================================
// Degraded results
// ============================================================================

/// Availability-first conversion of store results.
///
/// A failed round trip is logged with the operation name, counted, and
/// replaced by `fallback`.
pub trait Degrade<T> {
    fn or_degrade(self, op: &'static str, fallback: T) -> T;

    /// Like [`or_degrade`](Degrade::or_degrade), also logging the mutation
    /// that was attempted.
    fn or_degrade_write(self, op: &'static str, mutation: fmt::Arguments<'_>, fallback: T) -> T;
}

impl<T> Degrade<T> for Result<T, DbError> {
    fn or_degrade(self, op: &'static str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                warn!(op = op, error = %e, "Store operation failed, using fallback");
                crate::metrics::record_store_failure(op);
                fallback
            }
        }
    }

    fn or_degrade_write(self, op: &'static str, mutation: fmt::Arguments<'_>, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                warn!(op = op, mutation = %mutation, error = %e, "Store write failed, mutation dropped");
                crate::metrics::record_store_failure(op);
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_parse() {
        assert_eq!("-1001234567890".parse::<ChannelId>().unwrap().0, -1001234567890);
        assert_eq!(" 42 ".parse::<ChannelId>().unwrap(), ChannelId(42));
    }

    #[test]
    fn test_channel_id_rejects_non_integer() {
        let err = "@somechannel".parse::<ChannelId>().unwrap_err();
        assert!(matches!(err, GateError::InvalidInput(_)));
        assert_eq!(err.error_code(), "invalid_input");
        assert!("".parse::<ChannelId>().is_err());
        assert!("12.5".parse::<ChannelId>().is_err());
    }

    #[test]
    fn test_degrade_passes_values_through() {
        let ok: Result<u32, DbError> = Ok(7);
        assert_eq!(ok.or_degrade("test_ok", 0), 7);
    }

    #[test]
    fn test_degrade_uses_fallback() {
        let failed: Result<Vec<i64>, DbError> = Err(DbError::Integrity("corrupt".into()));
        assert!(failed.or_degrade("test_fail", Vec::new()).is_empty());
    }
}
