//! FSub registry: channels a user must join before content is released.
//!
//! Kept apart from the link registry; membership here says nothing about
//! whether a channel can be shared, and the reverse.

pub mod models;
pub mod queries;

pub use models::{FsubChannelRecord, FsubMode, ModeSummary, ModeUpdate};
pub use queries::FsubRepository;
