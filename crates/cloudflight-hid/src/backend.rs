//! HID host access.
//!
//! The session only talks to hardware through these traits so it can be
//! driven by an in-memory backend under test.

use std::ffi::CString;

use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::debug;

use crate::device::DeviceDescriptor;
use crate::error::{HidError, HidResult};

/// An opened HID interface.
#[cfg_attr(test, mockall::automock)]
pub trait ReportDevice: Send {
    /// Read one input report, waiting at most `timeout_ms`.
    ///
    /// Returns the number of bytes read, or 0 if nothing arrived in time.
    fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> HidResult<usize>;

    /// Write one output report, including its report ID byte.
    fn write(&self, data: &[u8]) -> HidResult<usize>;
}

/// Enumerates and opens HID interfaces on the host.
pub trait HidBackend: Send + Sync + 'static {
    /// List every HID interface currently exposed by the host.
    fn enumerate(&self) -> HidResult<Vec<DeviceDescriptor>>;

    /// Open one interface.
    fn open(&self, descriptor: &DeviceDescriptor) -> HidResult<Box<dyn ReportDevice>>;
}

impl ReportDevice for HidDevice {
    fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> HidResult<usize> {
        Ok(HidDevice::read_timeout(self, buf, timeout_ms)?)
    }

    fn write(&self, data: &[u8]) -> HidResult<usize> {
        Ok(HidDevice::write(self, data)?)
    }
}

/// [`HidBackend`] backed by the system HID library.
pub struct HidApiBackend {
    api: Mutex<HidApi>,
}

impl HidApiBackend {
    /// Initialise the HID library.
    ///
    /// # Errors
    /// Returns an error if the HID library cannot be initialised.
    pub fn new() -> HidResult<Self> {
        let api = HidApi::new()?;
        Ok(Self { api: Mutex::new(api) })
    }
}

impl HidBackend for HidApiBackend {
    fn enumerate(&self) -> HidResult<Vec<DeviceDescriptor>> {
        let mut api = self.api.lock();
        api.refresh_devices()?;
        let devices: Vec<_> = api.device_list().map(DeviceDescriptor::from).collect();
        debug!(count = devices.len(), "Enumerated HID interfaces");
        Ok(devices)
    }

    fn open(&self, descriptor: &DeviceDescriptor) -> HidResult<Box<dyn ReportDevice>> {
        let path = CString::new(descriptor.path.as_str())
            .map_err(|_| HidError::InvalidPath(descriptor.path.clone()))?;
        let device = self.api.lock().open_path(&path)?;
        Ok(Box::new(device))
    }
}
