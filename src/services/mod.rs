//! Gate services.
//!
//! [`Gate`] composes the registries, the join-request ledger and the
//! user stores into the operations the bot's command handlers call. The
//! transport is reached only through [`MembershipProbe`].

pub mod gate;
pub mod traits;

pub use gate::{AccessDecision, ChannelStatus, Gate};
pub use traits::{MembershipProbe, ProbeError};
