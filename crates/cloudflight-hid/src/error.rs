//! HID error types.

use thiserror::Error;

/// HID error type.
#[derive(Debug, Error)]
pub enum HidError {
    #[error("Headset not found - no HID interface matched the vendor, product or name")]
    DeviceNotFound,

    #[error("Status interface not found - battery and charging reports will not be requested")]
    StatusInterfaceNotFound,

    #[error("Failed to open interface {path}: {reason}")]
    InterfaceOpenFailure { path: String, reason: String },

    #[error("IO error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to write wake-up report to {path}: {reason}")]
    WakeupWriteFailure { path: String, reason: String },

    #[error("Device handle is closed")]
    Closed,

    #[error("Invalid device path: {0}")]
    InvalidPath(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] cloudflight_core::Error),

    #[error("HID API error: {0}")]
    Api(#[from] hidapi::HidError),
}

/// Result type for HID operations.
pub type HidResult<T> = Result<T, HidError>;
