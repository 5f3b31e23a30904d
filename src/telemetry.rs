//! Telemetry utilities for store timing and gate spans.

use std::time::Instant;

/// Guard for timing one store round trip.
///
/// Records the operation count and latency when dropped.
pub struct StoreTimer {
    table: &'static str,
    op: &'static str,
    start: Instant,
}

impl StoreTimer {
    /// Start timing a store operation.
    pub fn new(table: &'static str, op: &'static str) -> Self {
        Self {
            table,
            op,
            start: Instant::now(),
        }
    }
}

impl Drop for StoreTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_store_op(self.table, self.op, duration);
    }
}

/// Standardized span constructors for gate observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for an access check.
    pub fn access_check(user_id: i64) -> Span {
        info_span!("access_check", user_id = user_id)
    }

    /// Span for a token resolution.
    pub fn resolve(kind: &str) -> Span {
        info_span!("resolve", kind = %kind)
    }

    /// Span for an operator mutation on a channel.
    pub fn channel_op(op: &str, channel_id: Option<i64>) -> Span {
        if let Some(channel_id) = channel_id {
            info_span!("channel_op", op = %op, channel_id = channel_id)
        } else {
            info_span!("channel_op", op = %op)
        }
    }
}
