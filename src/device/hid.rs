//! Real transport over `hidapi`.

use std::ffi::CString;

use hidapi::{HidApi, HidDevice};
use serde::Serialize;
use tracing::{debug, trace};

use super::Transport;
use super::model::{Model, VENDOR_ID};
use crate::error::{DeckError, Result};

/// An Elgato HID device seen during enumeration, before it is opened.
#[derive(Debug, Clone, Serialize)]
pub struct UsbDevice {
    pub product_id: u16,
    /// Serial string from the USB descriptor, when the OS exposes it
    pub serial: Option<String>,
    /// Platform HID path used to open the device
    pub path: String,
}

impl UsbDevice {
    /// Resolve the model for this device.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Unrecognized`] for non-deck Elgato products.
    pub fn model(&self) -> Result<Model> {
        Model::select(self.product_id)
    }
}

/// List every HID device carrying the Elgato vendor id.
///
/// Devices are de-duplicated by path; unrecognized product ids are kept so
/// the caller decides whether to skip them.
pub fn list_devices(api: &HidApi) -> Vec<UsbDevice> {
    let mut devices: Vec<UsbDevice> = Vec::new();

    for info in api.device_list() {
        if info.vendor_id() != VENDOR_ID {
            continue;
        }
        let path = info.path().to_string_lossy().into_owned();
        if devices.iter().any(|d| d.path == path) {
            continue;
        }
        trace!(product_id = info.product_id(), %path, "Found Elgato HID device");
        devices.push(UsbDevice {
            product_id: info.product_id(),
            serial: info.serial_number().map(str::to_string),
            path,
        });
    }

    devices
}

/// Open a device found by [`list_devices`] in non-blocking mode.
///
/// # Errors
///
/// Returns [`DeckError::OpenFailed`] when the handle cannot be opened.
pub fn open_device(api: &HidApi, device: &UsbDevice) -> Result<HidTransport> {
    let path = CString::new(device.path.as_str())
        .map_err(|e| DeckError::OpenFailed(format!("invalid HID path: {e}")))?;

    let handle = api
        .open_path(&path)
        .map_err(|e| DeckError::OpenFailed(format!("{}: {e}", device.path)))?;
    handle.set_blocking_mode(false)?;

    debug!(path = %device.path, product_id = device.product_id, "Opened HID handle");
    Ok(HidTransport { handle })
}

/// Open HID handle for one deck.
pub struct HidTransport {
    handle: HidDevice,
}

impl Transport for HidTransport {
    fn send_feature_report(&mut self, data: &[u8]) -> Result<()> {
        self.handle.send_feature_report(data)?;
        Ok(())
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.handle.get_feature_report(buf)?)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.handle.write(data)?)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.handle.read(buf)?)
    }
}
