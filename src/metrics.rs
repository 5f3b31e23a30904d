//! Prometheus metrics collection for chanlink.
//!
//! - `chanlink_store_ops_total{table,op}` - Store round trips by table and operation
//! - `chanlink_store_duration_seconds{op}` - Store round-trip latency
//! - `chanlink_store_failures_total{op}` - Failed round trips that were degraded
//! - `chanlink_token_resolutions_total{kind,path}` - How tokens were resolved
//! - `chanlink_gate_decisions_total{decision}` - Access check outcomes
//!
//! Every recorder is a no-op until [`init`] has run.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Store
// ========================================================================

pub static STORE_OPS: OnceLock<IntCounterVec> = OnceLock::new();

pub static STORE_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

pub static STORE_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gate
// ========================================================================

/// Token resolutions by kind (primary/request) and path (stored/healed/created/miss).
pub static TOKEN_RESOLUTIONS: OnceLock<IntCounterVec> = OnceLock::new();

pub static GATE_DECISIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(STORE_OPS, IntCounterVec::new(Opts::new("chanlink_store_ops_total", "Store round trips by table and operation"), &["table", "op"]));
    register!(STORE_LATENCY, HistogramVec::new(
        HistogramOpts::new("chanlink_store_duration_seconds", "Store round-trip latency by operation")
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["op"]));
    register!(STORE_FAILURES, IntCounterVec::new(Opts::new("chanlink_store_failures_total", "Store failures converted to fallback values"), &["op"]));
    register!(TOKEN_RESOLUTIONS, IntCounterVec::new(Opts::new("chanlink_token_resolutions_total", "Token resolutions by kind and path"), &["kind", "path"]));
    register!(GATE_DECISIONS, IntCounterVec::new(Opts::new("chanlink_gate_decisions_total", "Access check outcomes"), &["decision"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recorders
// ============================================================================

/// Record one store round trip.
#[inline]
pub fn record_store_op(table: &str, op: &str, duration_secs: f64) {
    if let Some(c) = STORE_OPS.get() {
        c.with_label_values(&[table, op]).inc();
    }
    if let Some(h) = STORE_LATENCY.get() {
        h.with_label_values(&[op]).observe(duration_secs);
    }
}

/// Record a store failure that was replaced by a fallback.
#[inline]
pub fn record_store_failure(op: &str) {
    if let Some(c) = STORE_FAILURES.get() {
        c.with_label_values(&[op]).inc();
    }
}

/// Record how a token was resolved.
#[inline]
pub fn record_resolution(kind: &str, path: &str) {
    if let Some(c) = TOKEN_RESOLUTIONS.get() {
        c.with_label_values(&[kind, path]).inc();
    }
}

/// Record an access check outcome.
#[inline]
pub fn record_gate_decision(decision: &str) {
    if let Some(c) = GATE_DECISIONS.get() {
        c.with_label_values(&[decision]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();

        record_store_op("link_channels", "register", 0.001);
        record_resolution("primary", "created");
        record_gate_decision("cleared");

        let output = gather_metrics();
        assert!(output.contains("chanlink_store_ops_total"));
        assert!(output.contains("chanlink_token_resolutions_total"));
    }
}
