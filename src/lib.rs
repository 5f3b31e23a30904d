//! chanlink - channel link tokens and force-subscription gating.
//!
//! Library half of `chanlinkd`. The transport (bot API client, command
//! handlers) lives outside this crate and talks to it through
//! [`services::Gate`] and the [`services::MembershipProbe`] seam.

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod metrics;
pub mod services;
pub mod telemetry;
