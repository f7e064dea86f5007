//! Device model: discovery and the hidapi-backed channel.

use crate::error::{Error, Result};
use crate::protocol::{Frame, MSG_LEN};
use crate::transport::HidTransport;
use serde::{Deserialize, Serialize};
use std::ffi::CString;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Raw-HID usage page exposed by VIA/Vial firmware.
pub const VIA_USAGE_PAGE: u16 = 0xFF60;
/// Raw-HID usage exposed by VIA/Vial firmware.
pub const VIA_USAGE: u16 = 0x61;

/// Selects HID interfaces. Unset fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFilter {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub usage_page: Option<u16>,
    pub usage: Option<u16>,
}

impl DeviceFilter {
    /// Any VIA/Vial raw-HID interface.
    pub fn vial() -> Self {
        Self {
            usage_page: Some(VIA_USAGE_PAGE),
            usage: Some(VIA_USAGE),
            ..Self::default()
        }
    }

    /// The VIA/Vial interface of one specific device.
    pub fn vial_device(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id: Some(vendor_id),
            product_id: Some(product_id),
            ..Self::vial()
        }
    }

    fn matches_ids(&self, vid: u16, pid: u16, usage_page: u16, usage: u16) -> bool {
        self.vendor_id.map_or(true, |v| v == vid)
            && self.product_id.map_or(true, |p| p == pid)
            && self.usage_page.map_or(true, |p| p == usage_page)
            && self.usage.map_or(true, |u| u == usage)
    }

    pub fn matches(&self, info: &hidapi::DeviceInfo) -> bool {
        self.matches_ids(
            info.vendor_id(),
            info.product_id(),
            info.usage_page(),
            info.usage(),
        )
    }
}

/// Information about a discovered HID interface.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub vid: u16,
    pub pid: u16,
    pub path: String,
    pub product: Option<String>,
    pub manufacturer: Option<String>,
    pub serial: Option<String>,
}

/// List every HID interface matching any of `filters`.
///
/// An empty filter list matches nothing.
pub fn list_devices(api: &hidapi::HidApi, filters: &[DeviceFilter]) -> Vec<DeviceInfo> {
    debug!("Starting HID device enumeration");
    let devices: Vec<DeviceInfo> = api
        .device_list()
        .filter(|info| filters.iter().any(|f| f.matches(info)))
        .map(|info| DeviceInfo {
            vid: info.vendor_id(),
            pid: info.product_id(),
            path: info.path().to_string_lossy().into_owned(),
            product: info.product_string().map(str::to_string),
            manufacturer: info.manufacturer_string().map(str::to_string),
            serial: info.serial_number().map(str::to_string),
        })
        .collect();
    debug!(count = devices.len(), "Device enumeration complete");
    devices
}

/// hidapi-backed channel to one keyboard.
///
/// Owns the open device and is the only reader of its inbound reports.
#[derive(Default)]
pub struct HidChannel {
    device: Option<hidapi::HidDevice>,
    path: Option<CString>,
}

impl HidChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the single device matching `filters` and open it.
    ///
    /// Fails with `NoDeviceSelected` unless exactly one interface matches.
    /// Reopening the device that is already open is a no-op.
    pub fn open(&mut self, api: &hidapi::HidApi, filters: &[DeviceFilter]) -> Result<()> {
        let matched: Vec<&hidapi::DeviceInfo> = api
            .device_list()
            .filter(|info| filters.iter().any(|f| f.matches(info)))
            .collect();
        let [info] = matched.as_slice() else {
            return Err(Error::NoDeviceSelected {
                matched: matched.len(),
            });
        };

        let path = info.path().to_owned();
        if self.device.is_some() && self.path.as_ref() == Some(&path) {
            debug!(path = %path.to_string_lossy(), "Device already open");
            return Ok(());
        }
        self.close();

        let device = api.open_path(&path)?;
        info!(
            vid = format_args!("0x{:04X}", info.vendor_id()),
            pid = format_args!("0x{:04X}", info.product_id()),
            path = %path.to_string_lossy(),
            "Opened keyboard"
        );
        self.device = Some(device);
        self.path = Some(path);
        Ok(())
    }

    /// Close the device. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(path) = self.path.take() {
            info!(path = %path.to_string_lossy(), "Closed keyboard");
        }
        self.device = None;
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }
}

impl HidTransport for HidChannel {
    fn send_report(&mut self, frame: &Frame, timeout: Duration) -> Result<Vec<u8>> {
        let device = self.device.as_ref().ok_or(Error::DeviceNotOpen)?;

        // Drop reports left over from a request that timed out.
        let mut buf = [0u8; MSG_LEN];
        let mut stale = 0usize;
        while device.read_timeout(&mut buf, 0)? > 0 {
            stale += 1;
        }
        if stale > 0 {
            debug!(stale, "Discarded stale inbound reports");
        }

        // Report id 0 precedes the payload on the wire.
        let mut out = [0u8; MSG_LEN + 1];
        out[1..].copy_from_slice(frame.as_bytes());
        device.write(&out)?;

        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let n = device.read_timeout(&mut buf, millis)?;
        if n == 0 {
            return Err(Error::ResponseTimeout(timeout));
        }
        trace!(len = n, "HID read complete");
        Ok(buf[..n].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vial_filter_matches_raw_hid_interface_only() {
        let f = DeviceFilter::vial();
        assert!(f.matches_ids(0x1234, 0x5678, VIA_USAGE_PAGE, VIA_USAGE));
        assert!(!f.matches_ids(0x1234, 0x5678, 0x0001, 0x06)); // boot keyboard interface
    }

    #[test]
    fn device_filter_checks_ids() {
        let f = DeviceFilter::vial_device(0xFEED, 0x0001);
        assert!(f.matches_ids(0xFEED, 0x0001, VIA_USAGE_PAGE, VIA_USAGE));
        assert!(!f.matches_ids(0xFEED, 0x0002, VIA_USAGE_PAGE, VIA_USAGE));
        assert!(!f.matches_ids(0xBEEF, 0x0001, VIA_USAGE_PAGE, VIA_USAGE));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(DeviceFilter::default().matches_ids(1, 2, 3, 4));
    }

    #[test]
    fn closed_channel_rejects_requests() {
        let mut channel = HidChannel::new();
        let frame = Frame::new(crate::protocol::cmd::GET_PROTOCOL_VERSION, &[]).unwrap();
        assert!(matches!(
            channel.send_report(&frame, Duration::from_millis(1)),
            Err(Error::DeviceNotOpen)
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let mut channel = HidChannel::new();
        channel.close();
        channel.close();
        assert!(!channel.is_open());
    }

    #[test]
    fn filter_serde_roundtrip() {
        let f = DeviceFilter::vial_device(0xFEED, 0x6060);
        let json = serde_json::to_string(&f).expect("serialize filter");
        let back: DeviceFilter = serde_json::from_str(&json).expect("deserialize filter");
        assert_eq!(back, f);
    }
}
