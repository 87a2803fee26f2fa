//! Device abstraction layer for Stream Deck hardware.
//!
//! Three layers live here:
//!
//! - [`model`]: the closed table of supported models and their geometry
//! - [`protocol`]: pure report builders and parsers per protocol family
//! - [`Transport`]: the raw HID handle, with a real ([`hid`]) and a
//!   recording ([`mock`]) implementation
//!
//! Higher level behavior (polling, pages, icons) belongs to
//! [`Deck`](crate::deck::Deck).

pub mod hid;
mod info;
pub mod mock;
pub mod model;
pub mod protocol;

pub use hid::{HidTransport, UsbDevice, list_devices, open_device};
pub use info::{DeckEvent, DeviceInfo};
pub use model::{ImageFormat, IconLayout, Model, Orientation, Protocol};

use crate::error::Result;

/// Byte-level access to one open deck.
///
/// Implementations must be non-blocking: `read` returns `Ok(0)` immediately
/// when no input report is pending.
pub trait Transport {
    /// Send a feature report. Byte 0 is the report id.
    ///
    /// # Errors
    ///
    /// Returns an error if the report could not be delivered.
    fn send_feature_report(&mut self, data: &[u8]) -> Result<()>;

    /// Fetch a feature report into `buf`, whose byte 0 holds the report id.
    ///
    /// # Errors
    ///
    /// Returns an error if the device did not answer.
    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write one output report.
    ///
    /// # Errors
    ///
    /// Returns an error on communication failure.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Non-blocking read of one input report. `Ok(0)` means nothing pending.
    ///
    /// # Errors
    ///
    /// Returns an error on communication failure.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Type alias for boxed trait object.
pub type BoxedTransport = Box<dyn Transport>;

