//! FSub registry models.

use crate::db::RecordStatus;
use crate::error::GateError;
use std::fmt;
use std::str::FromStr;

/// Enforcement mode of an fsub channel.
///
/// Channels start `Off`; only an explicit mode change turns gating on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FsubMode {
    On,
    #[default]
    Off,
}

impl FsubMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

impl FromStr for FsubMode {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ => Err(GateError::InvalidInput(format!(
                "mode must be 'on' or 'off', got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for FsubMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A channel in the fsub registry.
#[derive(Debug, Clone)]
pub struct FsubChannelRecord {
    pub channel_id: i64,
    pub status: RecordStatus,
    pub mode: FsubMode,
    pub mode_updated_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

/// Counts reported by a bulk mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeUpdate {
    /// Active channels whose mode actually changed.
    pub updated: u64,
    /// Active channels the update applied to.
    pub matched: u64,
}

/// Mode overview across all active fsub channels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModeSummary {
    pub total_channels: usize,
    pub on_count: usize,
    pub off_count: usize,
    /// `(channel_id, mode)` in insertion order.
    pub channels: Vec<(i64, FsubMode)>,
}

impl ModeSummary {
    pub fn from_channels(channels: Vec<(i64, FsubMode)>) -> Self {
        let on_count = channels.iter().filter(|(_, mode)| mode.is_on()).count();
        Self {
            total_channels: channels.len(),
            on_count,
            off_count: channels.len() - on_count,
            channels,
        }
    }
}
