//! Cloudflight Core - decoding logic for HyperX Cloud Flight status reports.
//!
//! This crate turns raw HID reports from the headset dongle into typed
//! signals, estimates battery percentage from the firmware's charge
//! telemetry, and applies the change/heartbeat dedupe policy. It performs
//! no I/O; the `cloudflight-hid` crate feeds it.

pub mod battery;
pub mod config;
pub mod decoder;
pub mod dedupe;
pub mod error;
pub mod processor;
pub mod signal;

pub use config::SessionConfig;
pub use decoder::decode;
pub use dedupe::{DedupePolicy, SessionState};
pub use error::{Error, Result};
pub use processor::{Processed, ReportProcessor};
pub use signal::{DecodedSignal, HeadsetEvent, PowerState, VolumeDirection};
