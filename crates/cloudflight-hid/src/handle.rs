//! Owned handles to opened interfaces.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::backend::ReportDevice;
use crate::device::DeviceDescriptor;
use crate::error::{HidError, HidResult};

/// Largest input report the dongle sends, rounded up to a full-speed packet.
pub const MAX_REPORT_LEN: usize = 64;

/// An opened HID interface.
///
/// The device sits behind a lock so the reader thread and the keep-alive
/// writer can share one handle per path. Closing drops the device; every
/// later read or write fails with [`HidError::Closed`].
pub struct DeviceHandle {
    descriptor: DeviceDescriptor,
    device: Mutex<Option<Box<dyn ReportDevice>>>,
}

impl DeviceHandle {
    /// Wrap an opened device.
    #[must_use]
    pub fn new(descriptor: DeviceDescriptor, device: Box<dyn ReportDevice>) -> Self {
        Self { descriptor, device: Mutex::new(Some(device)) }
    }

    /// Descriptor this handle was opened from.
    #[must_use]
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// Interface path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.descriptor.path
    }

    /// Read one report, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` if no report arrived in time.
    ///
    /// # Errors
    /// Returns [`HidError::Closed`] after [`close`](Self::close), or
    /// [`HidError::Io`] if the read fails.
    pub fn read_report(&self, timeout: Duration) -> HidResult<Option<Vec<u8>>> {
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let mut buf = [0u8; MAX_REPORT_LEN];

        let guard = self.device.lock();
        let device = guard.as_ref().ok_or(HidError::Closed)?;
        let len = device.read_timeout(&mut buf, timeout_ms).map_err(|e| self.io_error(&e))?;

        Ok((len > 0).then(|| buf[..len].to_vec()))
    }

    /// Write one output report.
    ///
    /// # Errors
    /// Returns [`HidError::Closed`] after [`close`](Self::close), or
    /// [`HidError::Io`] if the write fails.
    pub fn write(&self, data: &[u8]) -> HidResult<usize> {
        let guard = self.device.lock();
        let device = guard.as_ref().ok_or(HidError::Closed)?;
        device.write(data).map_err(|e| self.io_error(&e))
    }

    /// Close the interface.
    ///
    /// Returns `true` if this call closed it, `false` if it was already closed.
    pub fn close(&self) -> bool {
        let closed = self.device.lock().take().is_some();
        if closed {
            debug!(path = %self.path(), "Closed HID interface");
        }
        closed
    }

    /// Whether the interface is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.device.lock().is_some()
    }

    fn io_error(&self, err: &HidError) -> HidError {
        match err {
            HidError::Closed => HidError::Closed,
            other => HidError::Io { path: self.path().to_string(), reason: other.to_string() },
        }
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("path", &self.descriptor.path)
            .field("open", &self.is_open())
            .finish()
    }
}
