//! Compose an [`Icon`] into a device raster and encode it.
//!
//! The pipeline has two stages that are kept separate so tests can inspect
//! pixels before encoding:
//!
//! 1. [`IconRenderer::compose`]: paint background, picture and text on an
//!    RGBA canvas, then orient it for the device.
//! 2. [`IconRenderer::encode`]: BMP or JPEG, as the device expects.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, Rgba as Pixel32, RgbaImage};
use tracing::{debug, trace};

use super::{Icon, Rgba};
use crate::device::{IconLayout, ImageFormat};
use crate::error::{DeckError, Result};

/// Edge length of symbolic icons, centered on the key.
pub const ICON_SIZE: u32 = 32;

/// Gap between the bottom of the text and the bottom edge.
pub const TEXT_BOTTOM_MARGIN: i32 = 3;

const JPEG_QUALITY: u8 = 96;

/// Options for one [`IconRenderer::compose`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeFlags {
    /// Skip the per-model orientation stage, for previews.
    pub ignore_transforms: bool,
}

/// Rasterizes icons for one display surface.
#[derive(Debug, Clone)]
pub struct IconRenderer {
    layout: IconLayout,
    icon_dirs: Vec<PathBuf>,
}

impl IconRenderer {
    pub fn new(layout: IconLayout, icon_dirs: Vec<PathBuf>) -> Self {
        Self { layout, icon_dirs }
    }

    pub const fn layout(&self) -> &IconLayout {
        &self.layout
    }

    /// Compose and encode in one go.
    ///
    /// # Errors
    ///
    /// See [`Self::compose`] and [`Self::encode`].
    pub fn render(&self, icon: Option<&Icon>, relative: Option<&Icon>) -> Result<Vec<u8>> {
        let raster = self.compose(icon, relative, ComposeFlags::default())?;
        self.encode(&raster)
    }

    /// Paint `icon` on a canvas of the layout size.
    ///
    /// Picture and text layers missing from `icon` are taken from `relative`.
    /// No icon at all paints solid black.
    ///
    /// # Errors
    ///
    /// Returns an error when a picture file exists but cannot be decoded.
    pub fn compose(
        &self,
        icon: Option<&Icon>,
        relative: Option<&Icon>,
        flags: ComposeFlags,
    ) -> Result<RgbaImage> {
        let (width, height) = (self.layout.width, self.layout.height);

        let canvas = match (icon, relative) {
            (None, None) => RgbaImage::from_pixel(width, height, to_pixel(Rgba::BLACK)),
            (Some(icon), relative) => self.paint(icon, relative)?,
            (None, Some(relative)) => self.paint(relative, None)?,
        };

        if flags.ignore_transforms {
            return Ok(canvas);
        }
        Ok(self.orient(canvas))
    }

    fn paint(&self, icon: &Icon, relative: Option<&Icon>) -> Result<RgbaImage> {
        let (width, height) = (self.layout.width, self.layout.height);
        let background = icon.background_color.premultiplied();
        let mut canvas = RgbaImage::from_pixel(width, height, to_pixel(background));

        let opacity = icon
            .opacity
            .or_else(|| relative.and_then(|r| r.opacity))
            .unwrap_or(1.0)
            .clamp(0.0, 1.0);

        let picture = if icon.has_picture() {
            Some(icon)
        } else {
            relative.filter(|r| r.has_picture())
        };
        if let Some(source) = picture {
            // symbolic content and text read against the icon actually painted
            let foreground = source.color.unwrap_or_else(|| icon.foreground());
            self.paint_picture(&mut canvas, source, foreground, opacity)?;
        }

        let text = icon
            .text
            .as_deref()
            .or_else(|| relative.and_then(|r| r.text.as_deref()));
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            paint_text(&mut canvas, text, icon.background_color.contrasting(), opacity);
        }

        Ok(canvas)
    }

    fn paint_picture(
        &self,
        canvas: &mut RgbaImage,
        icon: &Icon,
        foreground: Rgba,
        opacity: f64,
    ) -> Result<()> {
        if let Some(file) = &icon.file {
            if file.exists() {
                let picture = image::open(file)?.to_rgba8();
                overlay_fitted(canvas, &picture, opacity);
                return Ok(());
            }
            debug!(path = %file.display(), "Icon file missing");
        }

        let Some(name) = &icon.icon_name else {
            return Ok(());
        };
        let Some(path) = self.resolve_icon_name(name) else {
            trace!(name, "Named icon not found in icon directories");
            return Ok(());
        };
        let picture = image::open(&path)?.to_rgba8();

        if name.ends_with("-symbolic") {
            let mask = imageops::resize(&picture, ICON_SIZE, ICON_SIZE, FilterType::Triangle);
            let tinted = tint(&mask, foreground);
            overlay_centered(canvas, &tinted, opacity);
        } else {
            overlay_fitted(canvas, &picture, opacity);
        }
        Ok(())
    }

    /// First `<dir>/<name>.png` that exists.
    pub fn resolve_icon_name(&self, name: &str) -> Option<PathBuf> {
        if name.contains(['/', '\\']) {
            return None;
        }
        self.icon_dirs
            .iter()
            .map(|dir| dir.join(format!("{name}.png")))
            .find(|path| Path::is_file(path))
    }

    /// Apply the layout's orientation.
    ///
    /// Rotation is declared before the flips in the transform stack, so
    /// content is flipped first and the flipped raster is then rotated
    /// clockwise about its center.
    fn orient(&self, mut canvas: RgbaImage) -> RgbaImage {
        let orientation = self.layout.orientation;
        if orientation.flip_x {
            imageops::flip_horizontal_in_place(&mut canvas);
        }
        if orientation.flip_y {
            imageops::flip_vertical_in_place(&mut canvas);
        }
        if orientation.rotate_90 {
            canvas = imageops::rotate90(&canvas);
        }
        canvas
    }

    /// Encode a composed raster in the device's format.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Encoding`] when the raster does not match the
    /// layout or a BMP comes out at the wrong size.
    pub fn encode(&self, raster: &RgbaImage) -> Result<Vec<u8>> {
        let (width, height) = raster.dimensions();
        if (width, height) != (self.layout.width, self.layout.height) {
            return Err(DeckError::Encoding(format!(
                "raster is {width}x{height}, layout expects {}x{}",
                self.layout.width, self.layout.height
            )));
        }

        let rgb = image::DynamicImage::ImageRgba8(raster.clone()).to_rgb8();
        let mut buf = Cursor::new(Vec::new());

        match self.layout.format {
            ImageFormat::Bmp => {
                BmpEncoder::new(&mut buf).encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)?;
                let data = buf.into_inner();
                let expected = self.layout.bmp_size();
                if data.len() != expected {
                    return Err(DeckError::Encoding(format!(
                        "bitmap is {} bytes, expected {expected}",
                        data.len()
                    )));
                }
                Ok(data)
            }
            ImageFormat::Jpeg => {
                JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode(
                    rgb.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )?;
                Ok(buf.into_inner())
            }
        }
    }
}

fn to_pixel(color: Rgba) -> Pixel32<u8> {
    let alpha = (color.alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    Pixel32([color.red, color.green, color.blue, alpha])
}

/// Alpha-blend `src` over the opaque `dst` pixel.
fn blend(dst: &mut Pixel32<u8>, src: [u8; 4], opacity: f64) {
    let a = f64::from(src[3]) / 255.0 * opacity;
    for channel in 0..3 {
        let mixed = f64::from(src[channel]).mul_add(a, f64::from(dst[channel]) * (1.0 - a));
        dst[channel] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = 255;
}

/// Replace the color of every pixel, keeping its alpha as coverage.
fn tint(mask: &RgbaImage, color: Rgba) -> RgbaImage {
    let coverage = color.alpha.clamp(0.0, 1.0);
    RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
        let alpha = f64::from(mask.get_pixel(x, y)[3]) * coverage;
        Pixel32([color.red, color.green, color.blue, alpha.round() as u8])
    })
}

fn overlay_centered(canvas: &mut RgbaImage, picture: &RgbaImage, opacity: f64) {
    let x0 = i64::from(canvas.width()) / 2 - i64::from(picture.width()) / 2;
    let y0 = i64::from(canvas.height()) / 2 - i64::from(picture.height()) / 2;

    for (x, y, pixel) in picture.enumerate_pixels() {
        let (cx, cy) = (x0 + i64::from(x), y0 + i64::from(y));
        let (Ok(cx), Ok(cy)) = (u32::try_from(cx), u32::try_from(cy)) else {
            continue;
        };
        if cx < canvas.width() && cy < canvas.height() {
            blend(canvas.get_pixel_mut(cx, cy), pixel.0, opacity);
        }
    }
}

/// Shrink a picture to the canvas where it is larger, then center it.
fn overlay_fitted(canvas: &mut RgbaImage, picture: &RgbaImage, opacity: f64) {
    let width = picture.width().min(canvas.width());
    let height = picture.height().min(canvas.height());

    if (width, height) == picture.dimensions() {
        overlay_centered(canvas, picture, opacity);
    } else {
        let scaled = imageops::resize(picture, width, height, FilterType::Triangle);
        overlay_centered(canvas, &scaled, opacity);
    }
}

fn paint_text(canvas: &mut RgbaImage, text: &str, color: Rgba, opacity: f64) {
    let font = &FONT_6X10;
    let lines = text.lines().count().max(1) as i32;
    let text_height = lines * font.character_size.height as i32;
    let y = canvas.height() as i32 - text_height - TEXT_BOTTOM_MARGIN;
    let x = canvas.width() as i32 / 2;

    let character_style = MonoTextStyle::new(font, Rgb888::new(color.red, color.green, color.blue));
    let text_style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Top)
        .build();

    let mut target = Canvas {
        image: canvas,
        opacity: opacity * color.alpha.clamp(0.0, 1.0),
    };
    // drawing into the canvas cannot fail
    let _ = Text::with_text_style(text, Point::new(x, y), character_style, text_style)
        .draw(&mut target);
}

/// `embedded-graphics` draw target over an RGBA raster.
struct Canvas<'a> {
    image: &'a mut RgbaImage,
    opacity: f64,
}

impl OriginDimensions for Canvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl DrawTarget for Canvas<'_> {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> std::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
    {
        let (width, height) = self.image.dimensions();
        for embedded_graphics::Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < width && y < height {
                blend(
                    self.image.get_pixel_mut(x, y),
                    [color.r(), color.g(), color.b(), 255],
                    self.opacity,
                );
            }
        }
        Ok(())
    }
}
