//! Cloudflight HID - HyperX Cloud Flight hardware integration.
//!
//! This crate finds the headset dongle's HID interfaces, keeps the status
//! interface reporting with periodic wake-up writes, and runs a session
//! that feeds every interface's reports through one shared
//! [`cloudflight_core::ReportProcessor`].

pub mod backend;
pub mod device;
pub mod error;
pub mod handle;
pub mod scheduler;
pub mod session;

pub use backend::{HidApiBackend, HidBackend, ReportDevice};
pub use device::DeviceDescriptor;
pub use error::{HidError, HidResult};
pub use handle::DeviceHandle;
pub use session::{EventReceiver, Session};
