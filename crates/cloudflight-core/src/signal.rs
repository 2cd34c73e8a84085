//! Decoded headset signals and the events surfaced to consumers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Headset power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    On,
    Off,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// Direction of a volume wheel step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeDirection {
    Up,
    Down,
}

impl fmt::Display for VolumeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

/// A single value decoded from a raw report, before dedupe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedSignal {
    Power(PowerState),
    Muted(bool),
    Volume(VolumeDirection),
    Charging(bool),
    /// Estimated battery percentage (0-100)
    Battery(u8),
    /// Report of a length the decoder does not recognise, verbatim
    Unknown(Vec<u8>),
}

/// An event surfaced by a headset session.
///
/// Every decoded signal that passes the dedupe policy becomes one of these,
/// plus `Error` for runtime failures that do not end the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadsetEvent {
    Power(PowerState),
    Muted(bool),
    Volume(VolumeDirection),
    Charging(bool),
    Battery(u8),
    Unknown(Vec<u8>),
    Error(String),
}

impl HeadsetEvent {
    /// Name of the channel this event is emitted on.
    #[must_use]
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Power(_) => "power",
            Self::Muted(_) => "muted",
            Self::Volume(_) => "volume",
            Self::Charging(_) => "charging",
            Self::Battery(_) => "battery",
            Self::Unknown(_) => "unknown",
            Self::Error(_) => "error",
        }
    }

    /// Build an error event from anything displayable.
    pub fn error(err: impl fmt::Display) -> Self {
        Self::Error(err.to_string())
    }
}

impl From<DecodedSignal> for HeadsetEvent {
    fn from(signal: DecodedSignal) -> Self {
        match signal {
            DecodedSignal::Power(state) => Self::Power(state),
            DecodedSignal::Muted(muted) => Self::Muted(muted),
            DecodedSignal::Volume(direction) => Self::Volume(direction),
            DecodedSignal::Charging(charging) => Self::Charging(charging),
            DecodedSignal::Battery(percentage) => Self::Battery(percentage),
            DecodedSignal::Unknown(data) => Self::Unknown(data),
        }
    }
}
