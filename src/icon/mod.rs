//! Icon description and JSON form.
//!
//! An [`Icon`] is a small declarative record: background, optional picture
//! (a file or a named icon), optional text. It is rasterized by
//! [`IconRenderer`] for a concrete [`IconLayout`](crate::device::IconLayout).
//!
//! A button shows its custom icon *over* its action's icon: every layer the
//! custom icon leaves unset falls back to the action icon, see
//! [`IconRenderer::compose`].

mod renderer;

pub use renderer::{ComposeFlags, ICON_SIZE, IconRenderer, TEXT_BOTTOM_MARGIN};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DeckError, Result};

/// Straight (non-premultiplied) color with channels in 0-255 and alpha in 0-1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: f64,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0.0);
    pub const BLACK: Self = Self::new(0, 0, 0, 1.0);
    pub const WHITE: Self = Self::new(255, 255, 255, 1.0);

    pub const fn new(red: u8, green: u8, blue: u8, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, 1.0)
    }

    /// Multiply color by alpha and make it opaque.
    pub fn premultiplied(self) -> Self {
        let alpha = self.alpha.clamp(0.0, 1.0);
        let scale = |c: u8| (f64::from(c) * alpha).round() as u8;
        Self::opaque(scale(self.red), scale(self.green), scale(self.blue))
    }

    /// Perceived intensity in 0-1.
    pub fn intensity(self) -> f64 {
        (f64::from(self.red) * 0.30 + f64::from(self.green) * 0.59 + f64::from(self.blue) * 0.11)
            / 255.0
    }

    /// Foreground that stays readable over this background.
    pub fn contrasting(self) -> Self {
        if self.premultiplied().intensity() > 0.5 {
            Self::BLACK
        } else {
            Self::WHITE
        }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.alpha - 1.0).abs() < f64::EPSILON {
            write!(f, "rgb({},{},{})", self.red, self.green, self.blue)
        } else {
            write!(
                f,
                "rgba({},{},{},{})",
                self.red, self.green, self.blue, self.alpha
            )
        }
    }
}

impl FromStr for Rgba {
    type Err = DeckError;

    /// Accepts `rgb(r,g,b)`, `rgba(r,g,b,a)`, `#rrggbb` and `#rrggbbaa`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || DeckError::Other(format!("Invalid color: {s}"));

        if let Some(hex) = s.strip_prefix('#') {
            let channel = |at: usize| {
                hex.get(at..at + 2)
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(invalid)
            };
            let alpha = match hex.len() {
                6 => 1.0,
                8 => f64::from(channel(6)?) / 255.0,
                _ => return Err(invalid()),
            };
            return Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, alpha));
        }

        let (body, has_alpha) = if let Some(body) = s.strip_prefix("rgba(") {
            (body, true)
        } else if let Some(body) = s.strip_prefix("rgb(") {
            (body, false)
        } else {
            return Err(invalid());
        };
        let body = body.strip_suffix(')').ok_or_else(invalid)?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();

        let expected = if has_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return Err(invalid());
        }

        let channel = |p: &str| -> Result<u8> {
            let value: f64 = p.parse().map_err(|_| invalid())?;
            Ok(value.round().clamp(0.0, 255.0) as u8)
        };
        let alpha = if has_alpha {
            parts[3]
                .parse::<f64>()
                .map_err(|_| invalid())?
                .clamp(0.0, 1.0)
        } else {
            1.0
        };

        Ok(Self::new(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha,
        ))
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Declarative icon content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Icon {
    #[serde(default)]
    pub background_color: Rgba,
    /// Foreground for symbolic icons; derived from the background when unset
    #[serde(skip)]
    pub color: Option<Rgba>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_file"
    )]
    pub file: Option<PathBuf>,
    /// Resolved as `<name>.png` in the configured icon directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Opacity of the picture and text layers; `None` inherits
    #[serde(skip)]
    pub opacity: Option<f64>,
}

fn deserialize_file<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<PathBuf>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|s| {
        PathBuf::from(s.strip_prefix("file://").map_or(s.as_str(), |p| p))
    }))
}

impl Icon {
    /// Icon showing a named icon.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            icon_name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_background(mut self, color: Rgba) -> Self {
        self.background_color = color;
        self
    }

    /// True when the icon carries a picture layer.
    pub fn has_picture(&self) -> bool {
        self.file.is_some() || self.icon_name.is_some()
    }

    /// Foreground color for symbolic content and text.
    pub fn foreground(&self) -> Rgba {
        self.color
            .unwrap_or_else(|| self.background_color.contrasting())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Parse the JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Json`] when `value` is not an icon object.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }
}
