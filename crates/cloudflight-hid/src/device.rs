//! Cloud Flight interface discovery and selection.

use tracing::{debug, info};

use crate::error::{HidError, HidResult};

/// Kingston / HyperX USB Vendor ID
pub const HYPERX_VID: u16 = 0x0951;
/// Known Cloud Flight dongle Product IDs (firmware revisions)
pub const CLOUD_FLIGHT_PIDS: [u16; 2] = [0x16c4, 0x1723];
/// Fallback product-name match, compared case-insensitively
pub const PRODUCT_NAME_HINT: &str = "cloud flight";

/// Usage of the vendor-defined status interface
pub const STATUS_USAGE: u16 = 0x0303;
/// Usage pages the status interface reports, depending on firmware
pub const STATUS_USAGE_PAGES: [u16; 2] = [0xff53, 0xff13];

/// One HID interface as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Product name string, if the host reports one
    pub product_name: Option<String>,
    /// HID usage
    pub usage: u16,
    /// HID usage page
    pub usage_page: u16,
    /// Platform-specific path used to open the interface
    pub path: String,
}

impl DeviceDescriptor {
    /// Whether this interface belongs to a known Cloud Flight dongle revision.
    #[must_use]
    pub fn is_known_revision(&self) -> bool {
        self.vendor_id == HYPERX_VID && CLOUD_FLIGHT_PIDS.contains(&self.product_id)
    }

    /// Whether the product name contains the Cloud Flight marketing name.
    #[must_use]
    pub fn matches_product_name(&self) -> bool {
        self.product_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(PRODUCT_NAME_HINT))
    }
}

impl From<&hidapi::DeviceInfo> for DeviceDescriptor {
    fn from(info: &hidapi::DeviceInfo) -> Self {
        Self {
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            product_name: info.product_string().map(str::to_string),
            usage: info.usage(),
            usage_page: info.usage_page(),
            path: info.path().to_string_lossy().into_owned(),
        }
    }
}

/// Select every interface belonging to the headset.
///
/// Interfaces matching the vendor and a known product ID win as a set;
/// only when there are none is the product name consulted.
///
/// # Errors
/// Returns [`HidError::DeviceNotFound`] if neither rule matches anything.
pub fn select_interfaces(devices: &[DeviceDescriptor]) -> HidResult<Vec<DeviceDescriptor>> {
    let by_id: Vec<_> = devices.iter().filter(|d| d.is_known_revision()).cloned().collect();
    if !by_id.is_empty() {
        info!(count = by_id.len(), "Cloud Flight interfaces found by vendor/product ID");
        return Ok(by_id);
    }

    let by_name: Vec<_> = devices.iter().filter(|d| d.matches_product_name()).cloned().collect();
    if !by_name.is_empty() {
        info!(count = by_name.len(), "Cloud Flight interfaces found by product name");
        return Ok(by_name);
    }

    debug!(scanned = devices.len(), "No Cloud Flight interface found");
    Err(HidError::DeviceNotFound)
}

/// Pick the interface that accepts wake-up writes and emits status reports.
///
/// Prefers a usage and usage-page match, falling back to usage alone for
/// hosts that do not report usage pages.
#[must_use]
pub fn select_status_interface(interfaces: &[DeviceDescriptor]) -> Option<&DeviceDescriptor> {
    interfaces
        .iter()
        .find(|d| d.usage == STATUS_USAGE && STATUS_USAGE_PAGES.contains(&d.usage_page))
        .or_else(|| interfaces.iter().find(|d| d.usage == STATUS_USAGE))
}
