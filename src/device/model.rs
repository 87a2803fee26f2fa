//! Static capability table for every supported deck model.
//!
//! The set of models is closed: a [`Model`] is selected once from the USB
//! product id and every per-variant difference is answered by matching on it.

use serde::Serialize;

use crate::error::{DeckError, Result};

/// USB vendor id shared by every supported deck.
pub const VENDOR_ID: u16 = 0x0fd9;

/// Poll cadence for input reports, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 16;

/// Supported deck models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Model {
    /// Stream Deck Mini (6 keys, 3x2)
    Mini,
    /// Stream Deck Mini MK.2 (6 keys, 3x2)
    MiniV2,
    /// Stream Deck Original (15 keys, 5x3)
    Original,
    /// Stream Deck Original V2 (15 keys, 5x3)
    OriginalV2,
    /// Stream Deck MK.2 (15 keys, 5x3)
    Mk2,
    /// Stream Deck XL (32 keys, 8x4)
    Xl,
    /// Stream Deck XL V2 (32 keys, 8x4)
    XlV2,
    /// Stream Deck Pedal (3 pedals, no display)
    Pedal,
    /// Stream Deck + (8 keys, 4 dials, touchscreen)
    Plus,
    /// Stream Deck Neo (8 keys)
    Neo,
    /// Simulated 15 key deck with no hardware behind it
    FakeOriginal,
    /// Simulated 32 key deck with no hardware behind it
    FakeXl,
}

/// Wire protocol family. Each family shares report layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// First generation, small reports, 0-based image pages.
    Mini,
    /// First generation, 8191 byte reports, mirrored key order.
    Original,
    /// Second generation (MK.2, XL, Neo, Original V2).
    Gen2,
    /// Second generation with dial and touchscreen input events.
    Plus,
    /// Input only; display operations are no-ops.
    Pedal,
    /// No hardware; every operation is a no-op.
    Virtual,
}

/// Encoded pixel container expected by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Bmp,
    Jpeg,
}

/// Geometric transforms applied after composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Orientation {
    pub flip_x: bool,
    pub flip_y: bool,
    pub rotate_90: bool,
}

impl Orientation {
    pub const NONE: Self = Self {
        flip_x: false,
        flip_y: false,
        rotate_90: false,
    };
    pub const FLIP_XY: Self = Self {
        flip_x: true,
        flip_y: true,
        rotate_90: false,
    };
    pub const FLIP_Y_ROTATE: Self = Self {
        flip_x: false,
        flip_y: true,
        rotate_90: true,
    };
}

/// Raster geometry of one display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IconLayout {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub orientation: Orientation,
}

impl IconLayout {
    const fn new(width: u32, height: u32, format: ImageFormat, orientation: Orientation) -> Self {
        Self {
            width,
            height,
            format,
            orientation,
        }
    }

    /// Exact byte size of a 24-bit BMP with this geometry.
    pub const fn bmp_size(&self) -> usize {
        (self.width * self.height * 3) as usize + 54
    }
}

/// Touchscreen strip geometry (Stream Deck + only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TouchscreenLayout {
    pub layout: IconLayout,
    pub slots: usize,
}

impl TouchscreenLayout {
    /// Pixel width of one slot.
    pub const fn slot_width(&self) -> u32 {
        self.layout.width / self.slots as u32
    }
}

const ALL_MODELS: [Model; 10] = [
    Model::Original,
    Model::OriginalV2,
    Model::Mini,
    Model::MiniV2,
    Model::Xl,
    Model::XlV2,
    Model::Mk2,
    Model::Pedal,
    Model::Plus,
    Model::Neo,
];

impl Model {
    /// Select the model for a USB product id.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Unrecognized`] for ids outside the table. Callers
    /// enumerating arbitrary USB devices should skip those silently.
    pub fn select(product_id: u16) -> Result<Self> {
        ALL_MODELS
            .iter()
            .copied()
            .find(|model| model.product_id() == Some(product_id))
            .ok_or(DeckError::Unrecognized { product_id })
    }

    /// Every model backed by real hardware.
    pub const fn hardware() -> &'static [Self] {
        &ALL_MODELS
    }

    /// USB product id, or `None` for simulated decks.
    pub const fn product_id(self) -> Option<u16> {
        match self {
            Self::Original => Some(0x0060),
            Self::OriginalV2 => Some(0x006d),
            Self::Mini => Some(0x0063),
            Self::MiniV2 => Some(0x0090),
            Self::Xl => Some(0x006c),
            Self::XlV2 => Some(0x008f),
            Self::Mk2 => Some(0x0080),
            Self::Pedal => Some(0x0086),
            Self::Plus => Some(0x0084),
            Self::Neo => Some(0x009a),
            Self::FakeOriginal | Self::FakeXl => None,
        }
    }

    pub const fn protocol(self) -> Protocol {
        match self {
            Self::Mini | Self::MiniV2 => Protocol::Mini,
            Self::Original => Protocol::Original,
            Self::OriginalV2 | Self::Mk2 | Self::Xl | Self::XlV2 | Self::Neo => Protocol::Gen2,
            Self::Plus => Protocol::Plus,
            Self::Pedal => Protocol::Pedal,
            Self::FakeOriginal | Self::FakeXl => Protocol::Virtual,
        }
    }

    /// Number of keys (pedals count as keys).
    pub const fn button_count(self) -> usize {
        match self {
            Self::Mini | Self::MiniV2 => 6,
            Self::Original | Self::OriginalV2 | Self::Mk2 | Self::FakeOriginal => 15,
            Self::Xl | Self::XlV2 | Self::FakeXl => 32,
            Self::Pedal => 3,
            Self::Plus | Self::Neo => 8,
        }
    }

    /// Number of key columns.
    pub const fn columns(self) -> usize {
        match self {
            Self::Mini | Self::MiniV2 | Self::Pedal => 3,
            Self::Original | Self::OriginalV2 | Self::Mk2 | Self::FakeOriginal => 5,
            Self::Xl | Self::XlV2 | Self::FakeXl => 8,
            Self::Plus | Self::Neo => 4,
        }
    }

    /// Number of key rows.
    pub const fn rows(self) -> usize {
        self.button_count().div_ceil(self.columns())
    }

    pub const fn dial_count(self) -> usize {
        match self {
            Self::Plus => 4,
            _ => 0,
        }
    }

    /// Key display geometry, or `None` for decks without displays.
    pub const fn icon_layout(self) -> Option<IconLayout> {
        use ImageFormat::{Bmp, Jpeg};

        match self {
            Self::Mini | Self::MiniV2 => Some(IconLayout::new(80, 80, Bmp, Orientation::FLIP_Y_ROTATE)),
            Self::Original | Self::FakeOriginal => {
                Some(IconLayout::new(72, 72, Bmp, Orientation::FLIP_XY))
            }
            Self::OriginalV2 | Self::Mk2 => Some(IconLayout::new(72, 72, Jpeg, Orientation::FLIP_XY)),
            Self::Xl | Self::XlV2 | Self::FakeXl => {
                Some(IconLayout::new(96, 96, Jpeg, Orientation::FLIP_XY))
            }
            Self::Neo => Some(IconLayout::new(96, 96, Jpeg, Orientation::FLIP_XY)),
            Self::Plus => Some(IconLayout::new(120, 120, Jpeg, Orientation::NONE)),
            Self::Pedal => None,
        }
    }

    pub const fn touchscreen(self) -> Option<TouchscreenLayout> {
        match self {
            Self::Plus => Some(TouchscreenLayout {
                layout: IconLayout::new(800, 100, ImageFormat::Jpeg, Orientation::NONE),
                slots: 4,
            }),
            _ => None,
        }
    }

    /// True when the wiring order of each key row is reversed.
    pub const fn mirrors_columns(self) -> bool {
        matches!(self.protocol(), Protocol::Original)
    }

    /// Map between logical and wire key index.
    ///
    /// Identity for every model except the original family, where each row is
    /// column-mirrored. The mapping is its own inverse.
    pub const fn swap_index(self, index: usize) -> usize {
        if !self.mirrors_columns() {
            return index;
        }
        let columns = self.columns();
        let column = index % columns;
        index - column + (columns - 1 - column)
    }

    pub const fn is_virtual(self) -> bool {
        matches!(self.protocol(), Protocol::Virtual)
    }

    /// Short machine name used in fake serial numbers.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Mini => "mini",
            Self::MiniV2 => "mini-v2",
            Self::Original => "original",
            Self::OriginalV2 => "original-v2",
            Self::Mk2 => "mk2",
            Self::Xl => "xl",
            Self::XlV2 => "xl-v2",
            Self::Pedal => "pedal",
            Self::Plus => "plus",
            Self::Neo => "neo",
            Self::FakeOriginal => "original",
            Self::FakeXl => "xl",
        }
    }

    /// Returns a human-readable name for this model.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Mini => "Stream Deck Mini",
            Self::MiniV2 => "Stream Deck Mini MK.2",
            Self::Original => "Stream Deck (Original)",
            Self::OriginalV2 => "Stream Deck (Original V2)",
            Self::Mk2 => "Stream Deck MK.2",
            Self::Xl => "Stream Deck XL",
            Self::XlV2 => "Stream Deck XL V2",
            Self::Pedal => "Stream Deck Pedal",
            Self::Plus => "Stream Deck +",
            Self::Neo => "Stream Deck Neo",
            Self::FakeOriginal => "Fake Deck (Original)",
            Self::FakeXl => "Fake Deck (XL)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_known_ids() {
        assert_eq!(Model::select(0x0060).unwrap(), Model::Original);
        assert_eq!(Model::select(0x006c).unwrap(), Model::Xl);
        assert_eq!(Model::select(0x0084).unwrap(), Model::Plus);
    }

    #[test]
    fn test_select_unknown_id() {
        let err = Model::select(0xbeef).unwrap_err();
        assert!(err.is_unrecognized());
    }

    #[test]
    fn test_every_hardware_model_round_trips_its_pid() {
        for &model in Model::hardware() {
            let pid = model.product_id().unwrap();
            assert_eq!(Model::select(pid).unwrap(), model);
        }
    }

    #[test]
    fn test_grid_button_counts() {
        for &model in Model::hardware() {
            if model == Model::Pedal {
                assert_eq!(model.button_count(), 3);
                continue;
            }
            assert_eq!(model.button_count(), model.rows() * model.columns(), "{model:?}");
        }
        assert_eq!(Model::Original.rows(), 3);
        assert_eq!(Model::Xl.rows(), 4);
        assert_eq!(Model::Mini.rows(), 2);
    }

    #[test]
    fn test_swap_index_original() {
        assert_eq!(Model::Original.swap_index(0), 4);
        assert_eq!(Model::Original.swap_index(4), 0);
        assert_eq!(Model::Original.swap_index(2), 2);
        assert_eq!(Model::Original.swap_index(5), 9);
        assert_eq!(Model::Original.swap_index(14), 10);
        for i in 0..15 {
            assert_eq!(Model::Original.swap_index(Model::Original.swap_index(i)), i);
        }
    }

    #[test]
    fn test_swap_index_identity_elsewhere() {
        for i in 0..15 {
            assert_eq!(Model::Mk2.swap_index(i), i);
            assert_eq!(Model::OriginalV2.swap_index(i), i);
        }
    }

    #[test]
    fn test_icon_layouts() {
        let mini = Model::Mini.icon_layout().unwrap();
        assert_eq!((mini.width, mini.height, mini.format), (80, 80, ImageFormat::Bmp));
        assert!(mini.orientation.rotate_90);

        let original = Model::Original.icon_layout().unwrap();
        assert_eq!(original.bmp_size(), 15606);

        assert!(Model::Pedal.icon_layout().is_none());
        assert_eq!(Model::Plus.icon_layout().unwrap().orientation, Orientation::NONE);
    }

    #[test]
    fn test_plus_extras() {
        assert_eq!(Model::Plus.dial_count(), 4);
        let touch = Model::Plus.touchscreen().unwrap();
        assert_eq!(touch.slots, 4);
        assert_eq!(touch.slot_width(), 200);
        assert!(Model::Xl.touchscreen().is_none());
    }
}
