//! Byte-level report layouts for every protocol family.
//!
//! Everything here is pure: functions build the exact reports to send, or
//! decode the reports received, and never touch a handle. The
//! [`Deck`](crate::deck::Deck) pushes the results through a
//! [`Transport`](super::Transport).

use std::ops::Range;

use serde::Serialize;

use super::model::{Model, Protocol};
use crate::error::{DeckError, Result};

/// Feature report length for first generation decks.
pub const GEN1_FEATURE_LEN: usize = 17;
/// Feature report length for second generation decks.
pub const GEN2_FEATURE_LEN: usize = 32;

/// Output report length used by the chunked image write, per family.
pub const fn image_report_len(protocol: Protocol) -> usize {
    match protocol {
        Protocol::Original => 8191,
        _ => 1024,
    }
}

/// Header length preceding each image chunk, per family.
pub const fn image_header_len(protocol: Protocol) -> usize {
    match protocol {
        Protocol::Gen2 | Protocol::Plus => 8,
        _ => 16,
    }
}

/// Convert a 0.0-1.0 brightness into the integer percentage sent on the wire.
pub fn brightness_percent(brightness: f64) -> u8 {
    (brightness * 100.0).clamp(0.0, 100.0) as u8
}

/// Feature report that resets the deck to its logo screen.
pub fn reset_report(protocol: Protocol) -> Option<Vec<u8>> {
    match protocol {
        Protocol::Mini | Protocol::Original => Some(padded(&[0x0b, 0x63], GEN1_FEATURE_LEN)),
        Protocol::Gen2 | Protocol::Plus => Some(padded(&[0x03, 0x02], GEN2_FEATURE_LEN)),
        Protocol::Pedal | Protocol::Virtual => None,
    }
}

/// Feature report that sets the display brightness.
pub fn brightness_report(protocol: Protocol, brightness: f64) -> Option<Vec<u8>> {
    let percent = brightness_percent(brightness);
    match protocol {
        Protocol::Mini | Protocol::Original => Some(padded(
            &[0x05, 0x55, 0xaa, 0xd1, 0x01, percent],
            GEN1_FEATURE_LEN,
        )),
        Protocol::Gen2 | Protocol::Plus => {
            Some(padded(&[0x03, 0x08, percent], GEN2_FEATURE_LEN))
        }
        Protocol::Pedal | Protocol::Virtual => None,
    }
}

/// A get-feature-report request whose answer is a NUL padded string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRequest {
    pub report_id: u8,
    pub len: usize,
    pub payload: Range<usize>,
}

impl StringRequest {
    /// Buffer to hand to `get_feature_report`, report id in byte 0.
    pub fn buffer(&self) -> Vec<u8> {
        let mut buf = vec![0; self.len];
        buf[0] = self.report_id;
        buf
    }

    /// Extract the string from a response, stopping at the first NUL.
    pub fn parse(&self, response: &[u8]) -> String {
        let end = self.payload.end.min(response.len());
        let start = self.payload.start.min(end);
        let bytes = &response[start..end];
        let bytes = bytes
            .iter()
            .position(|&b| b == 0)
            .map_or(bytes, |nul| &bytes[..nul]);
        String::from_utf8_lossy(bytes).trim().to_string()
    }
}

pub fn serial_request(protocol: Protocol) -> Option<StringRequest> {
    match protocol {
        Protocol::Mini | Protocol::Original => Some(StringRequest {
            report_id: 0x03,
            len: GEN1_FEATURE_LEN,
            payload: 5..17,
        }),
        Protocol::Gen2 | Protocol::Plus | Protocol::Pedal => Some(StringRequest {
            report_id: 0x06,
            len: GEN2_FEATURE_LEN,
            payload: 2..32,
        }),
        Protocol::Virtual => None,
    }
}

pub fn firmware_request(protocol: Protocol) -> Option<StringRequest> {
    match protocol {
        Protocol::Mini | Protocol::Original => Some(StringRequest {
            report_id: 0x04,
            len: GEN1_FEATURE_LEN,
            payload: 5..17,
        }),
        Protocol::Gen2 | Protocol::Plus | Protocol::Pedal => Some(StringRequest {
            report_id: 0x05,
            len: GEN2_FEATURE_LEN,
            payload: 6..32,
        }),
        Protocol::Virtual => None,
    }
}

/// Split an encoded key image into the output reports for `model`.
///
/// `position` is the logical key index; mirrored models are swapped here.
/// Decks without displays produce no reports.
///
/// # Errors
///
/// Returns [`DeckError::Encoding`] when an original-family image is not the
/// exact BMP size the firmware expects.
pub fn image_reports(model: Model, position: usize, data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let protocol = model.protocol();
    let report_len = image_report_len(protocol);
    let header_len = image_header_len(protocol);

    let reports = match protocol {
        Protocol::Mini => chunked(data, report_len, header_len, report_len - header_len, |page, last, _| {
            vec![0x02, 0x01, page as u8, 0x00, u8::from(last), position as u8 + 1]
        }),
        Protocol::Original => {
            let expected = model
                .icon_layout()
                .map_or(0, |layout| layout.bmp_size());
            if data.len() != expected {
                return Err(DeckError::Encoding(format!(
                    "expected a {expected} byte bitmap, got {} bytes",
                    data.len()
                )));
            }
            let wire = model.swap_index(position) as u8;
            chunked(data, report_len, header_len, data.len() / 2, |page, last, _| {
                vec![0x02, 0x01, page as u8 + 1, 0x00, u8::from(last), wire + 1]
            })
        }
        Protocol::Gen2 | Protocol::Plus => {
            chunked(data, report_len, header_len, report_len - header_len, |page, last, len| {
                let len = len.to_le_bytes();
                let page = page.to_le_bytes();
                vec![0x02, 0x07, position as u8, u8::from(last), len[0], len[1], page[0], page[1]]
            })
        }
        Protocol::Pedal | Protocol::Virtual => Vec::new(),
    };

    Ok(reports)
}

/// Rectangle on the touchscreen strip being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// Split an encoded touchscreen image into Stream Deck + output reports.
pub fn touchscreen_reports(rect: ScreenRect, data: &[u8]) -> Vec<Vec<u8>> {
    const REPORT_LEN: usize = 1024;
    const HEADER_LEN: usize = 16;

    let x = rect.x.to_le_bytes();
    let y = rect.y.to_le_bytes();
    let w = rect.width.to_le_bytes();
    let h = rect.height.to_le_bytes();

    chunked(data, REPORT_LEN, HEADER_LEN, REPORT_LEN - HEADER_LEN, |page, last, len| {
        let page = page.to_le_bytes();
        let len = len.to_le_bytes();
        vec![
            0x02, 0x0c, x[0], x[1], y[0], y[1], w[0], w[1], h[0], h[1],
            u8::from(last), page[0], page[1], len[0], len[1], 0x00,
        ]
    })
}

/// Core chunking loop shared by every image write.
///
/// `header(page, is_last, chunk_len)` returns the header prefix; it is zero
/// padded to `header_len`, followed by the chunk, and the report is zero
/// padded to `report_len`.
fn chunked<F>(
    data: &[u8],
    report_len: usize,
    header_len: usize,
    chunk_len: usize,
    header: F,
) -> Vec<Vec<u8>>
where
    F: Fn(u16, bool, u16) -> Vec<u8>,
{
    let chunk_len = chunk_len.clamp(1, report_len - header_len);

    data.chunks(chunk_len)
        .enumerate()
        .map(|(page, chunk)| {
            let sent = page * chunk_len + chunk.len();
            let last = sent == data.len();

            let mut report = header(page as u16, last, chunk.len() as u16);
            report.resize(header_len, 0);
            report.extend_from_slice(chunk);
            report.resize(report_len, 0);
            report
        })
        .collect()
}

fn padded(prefix: &[u8], len: usize) -> Vec<u8> {
    let mut report = prefix.to_vec();
    report.resize(len, 0);
    report
}

/// Touch gesture reported by the Stream Deck + strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum TouchGesture {
    ShortPress,
    LongPress,
    Swipe { to_x: u16, to_y: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TouchEvent {
    pub x: u16,
    pub y: u16,
    #[serde(flatten)]
    pub gesture: TouchGesture,
}

/// One decoded input report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputReport {
    /// Pressed state per key, in logical order.
    Buttons(Vec<bool>),
    /// Signed rotation delta per dial.
    DialRotation(Vec<i8>),
    /// Pressed state per dial.
    DialPress(Vec<bool>),
    Touch(TouchEvent),
}

/// Number of bytes to request for one input read.
pub const fn input_report_len(model: Model) -> usize {
    match model.protocol() {
        Protocol::Mini | Protocol::Original => model.button_count() + 1,
        Protocol::Gen2 | Protocol::Pedal => model.button_count() + 4,
        Protocol::Plus => 14,
        Protocol::Virtual => 0,
    }
}

/// Decode the first `len` bytes of an input read.
///
/// Returns `None` when there is nothing to apply: an empty or short read, or
/// an event type this crate does not know.
pub fn parse_input(model: Model, data: &[u8]) -> Option<InputReport> {
    let count = model.button_count();

    match model.protocol() {
        Protocol::Mini | Protocol::Original => {
            let states = data.get(1..=count)?;
            let mut pressed = vec![false; count];
            for (raw, &state) in states.iter().enumerate() {
                pressed[model.swap_index(raw)] = state != 0;
            }
            Some(InputReport::Buttons(pressed))
        }
        Protocol::Gen2 | Protocol::Pedal => {
            let states = data.get(4..4 + count)?;
            Some(InputReport::Buttons(states.iter().map(|&s| s != 0).collect()))
        }
        Protocol::Plus => parse_plus(model, data),
        Protocol::Virtual => None,
    }
}

fn parse_plus(model: Model, data: &[u8]) -> Option<InputReport> {
    const BUTTON_EVENT: u8 = 0x00;
    const TOUCHSCREEN_EVENT: u8 = 0x02;
    const DIAL_EVENT: u8 = 0x03;

    let word = |at: usize| -> Option<u16> { Some(u16::from_le_bytes([*data.get(at)?, *data.get(at + 1)?])) };

    match *data.get(1)? {
        BUTTON_EVENT => {
            let count = model.button_count();
            let states = data.get(4..4 + count)?;
            Some(InputReport::Buttons(states.iter().map(|&s| s != 0).collect()))
        }
        TOUCHSCREEN_EVENT => {
            let gesture = match *data.get(4)? {
                1 => TouchGesture::ShortPress,
                2 => TouchGesture::LongPress,
                3 => TouchGesture::Swipe {
                    to_x: word(10)?,
                    to_y: word(12)?,
                },
                _ => return None,
            };
            Some(InputReport::Touch(TouchEvent {
                x: word(6)?,
                y: word(8)?,
                gesture,
            }))
        }
        DIAL_EVENT => {
            let dials = model.dial_count();
            let values = data.get(5..5 + dials)?;
            if *data.get(4)? == 0x01 {
                Some(InputReport::DialRotation(
                    values.iter().map(|&v| v as i8).collect(),
                ))
            } else {
                Some(InputReport::DialPress(values.iter().map(|&v| v != 0).collect()))
            }
        }
        _ => None,
    }
}
