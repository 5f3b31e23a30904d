//! Link registry: channels that can be shared through token links.
//!
//! Stores the primary and secondary tokens of each channel and the latest
//! invite link minted for it. Nothing here reads or writes the fsub registry.

pub mod models;
pub mod queries;

pub use models::{ChannelLinkRecord, InviteLink, LinkKind};
pub use queries::LinkRepository;
