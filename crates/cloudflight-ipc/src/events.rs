//! Wire representation of headset events.

use cloudflight_core::{HeadsetEvent, PowerState, VolumeDirection};
use serde::{Deserialize, Serialize};

/// One line of the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WireEvent {
    /// Headset switched on or off
    Power { state: PowerState },
    /// Microphone mute state
    Muted { muted: bool },
    /// Volume wheel step
    Volume { direction: VolumeDirection },
    /// Charger connected state
    Charging { charging: bool },
    /// Estimated battery percentage
    Battery { percentage: u8 },
    /// Unrecognised report, verbatim
    Unknown { data: Vec<u8> },
    /// Runtime failure
    Error { message: String },
}

impl From<HeadsetEvent> for WireEvent {
    fn from(event: HeadsetEvent) -> Self {
        match event {
            HeadsetEvent::Power(state) => Self::Power { state },
            HeadsetEvent::Muted(muted) => Self::Muted { muted },
            HeadsetEvent::Volume(direction) => Self::Volume { direction },
            HeadsetEvent::Charging(charging) => Self::Charging { charging },
            HeadsetEvent::Battery(percentage) => Self::Battery { percentage },
            HeadsetEvent::Unknown(data) => Self::Unknown { data },
            HeadsetEvent::Error(message) => Self::Error { message },
        }
    }
}

impl From<WireEvent> for HeadsetEvent {
    fn from(event: WireEvent) -> Self {
        match event {
            WireEvent::Power { state } => Self::Power(state),
            WireEvent::Muted { muted } => Self::Muted(muted),
            WireEvent::Volume { direction } => Self::Volume(direction),
            WireEvent::Charging { charging } => Self::Charging(charging),
            WireEvent::Battery { percentage } => Self::Battery(percentage),
            WireEvent::Unknown { data } => Self::Unknown(data),
            WireEvent::Error { message } => Self::Error(message),
        }
    }
}
