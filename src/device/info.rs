//! Descriptive types reported for an open deck.

use serde::Serialize;

use super::model::{ImageFormat, Model};
use super::protocol::TouchEvent;

/// Information about an open deck.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    /// Device serial number
    pub serial: String,
    /// Human-readable product name
    pub product_name: String,
    /// Firmware version string
    pub firmware_version: String,
    /// Model identifier
    pub model: Model,
    /// Number of keys on the device
    pub button_count: usize,
    /// Number of key rows
    pub rows: usize,
    /// Number of key columns
    pub columns: usize,
    /// Number of dials
    pub dial_count: usize,
    /// Key image size in pixels, absent for decks without displays
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_format: Option<ImageFormat>,
    pub has_touchscreen: bool,
}

impl DeviceInfo {
    pub fn new(model: Model, serial: String, firmware_version: String) -> Self {
        let layout = model.icon_layout();
        Self {
            serial,
            product_name: model.display_name().to_string(),
            firmware_version,
            model,
            button_count: model.button_count(),
            rows: model.rows(),
            columns: model.columns(),
            dial_count: model.dial_count(),
            icon_size: layout.map(|l| (l.width, l.height)),
            icon_format: layout.map(|l| l.format),
            has_touchscreen: model.touchscreen().is_some(),
        }
    }
}

/// Input edge raised by one poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeckEvent {
    ButtonPressed { position: usize },
    ButtonReleased { position: usize },
    DialRotated { dial: usize, delta: i8 },
    DialPressed { dial: usize },
    DialReleased { dial: usize },
    Touch(TouchEvent),
}
