//! Binary layouts of the Hue light control characteristics.
//!
//! Every function here is pure. Encoders are total over their input type;
//! decoders fail only with [`ParseError::MalformedPayload`] on short input.

use bytes::{Buf, BufMut};

use crate::error::{ParseError, ParseResult};
use crate::types::{CompositeState, DecodedText};

/// Lowest color temperature the bulbs accept, in mired (~6500 K).
pub const MIN_MIRED: i32 = 153;

/// Highest color temperature the bulbs accept, in mired (~2200 K).
pub const MAX_MIRED: i32 = 454;

/// Minimum length of a composite-state payload.
pub const MIN_COMPOSITE_STATE_BYTES: usize = 6;

/// Offset of the on/off flag in the composite-state payload.
///
/// Reverse-engineered from firmware traffic; not confirmed on every model.
pub const COMPOSITE_ON_OFFSET: usize = 2;

/// Offset of the brightness byte in the composite-state payload.
///
/// Reverse-engineered from firmware traffic; not confirmed on every model.
pub const COMPOSITE_BRIGHTNESS_OFFSET: usize = 5;

const XY_SCALE: f64 = 65535.0;

/// Encode a switch value (`0x01` on, `0x00` off).
#[must_use]
pub fn encode_switch(on: bool) -> [u8; 1] {
    [u8::from(on)]
}

/// Decode a switch value. Only `0x01` means on.
pub fn decode_switch(payload: &[u8]) -> ParseResult<bool> {
    payload
        .first()
        .map(|b| *b == 0x01)
        .ok_or_else(|| ParseError::malformed("switch", 1, 0))
}

/// Encode a brightness level.
///
/// The level is passed through unchanged; callers scale percentages first.
#[must_use]
pub fn encode_brightness(level: u8) -> [u8; 1] {
    [level]
}

/// Decode a brightness level.
pub fn decode_brightness(payload: &[u8]) -> ParseResult<u8> {
    payload
        .first()
        .copied()
        .ok_or_else(|| ParseError::malformed("brightness", 1, 0))
}

/// Clamp a mired value into the range the bulbs accept.
#[must_use]
pub fn clamp_mired(mired: i32) -> i16 {
    // The clamped range fits in i16.
    mired.clamp(MIN_MIRED, MAX_MIRED) as i16
}

/// Encode a color temperature in mired as a little-endian `i16`.
///
/// Values outside `[MIN_MIRED, MAX_MIRED]` are clamped, not rejected.
///
/// # Examples
///
/// ```
/// use hue_types::codec::encode_temperature;
///
/// assert_eq!(encode_temperature(300), [0x2C, 0x01]);
/// assert_eq!(encode_temperature(10), encode_temperature(153));
/// ```
#[must_use]
pub fn encode_temperature(mired: i32) -> [u8; 2] {
    let mut out = [0u8; 2];
    let mut buf = &mut out[..];
    buf.put_i16_le(clamp_mired(mired));
    out
}

/// Decode a color temperature in mired.
pub fn decode_temperature(payload: &[u8]) -> ParseResult<i16> {
    if payload.len() < 2 {
        return Err(ParseError::malformed("temperature", 2, payload.len()));
    }
    let mut buf = payload;
    Ok(buf.get_i16_le())
}

fn scale_coordinate(value: f64) -> u16 {
    // NaN clamps to 0 via the saturating cast.
    (value.clamp(0.0, 1.0) * XY_SCALE).round() as u16
}

/// Encode CIE xy coordinates as two little-endian `u16`, each scaled to `0xFFFF`.
///
/// Coordinates are clamped to `[0.0, 1.0]` first.
#[must_use]
pub fn encode_color_xy(x: f64, y: f64) -> [u8; 4] {
    let mut out = [0u8; 4];
    let mut buf = &mut out[..];
    buf.put_u16_le(scale_coordinate(x));
    buf.put_u16_le(scale_coordinate(y));
    out
}

/// Decode CIE xy coordinates from the color characteristic.
pub fn decode_color_xy(payload: &[u8]) -> ParseResult<(f64, f64)> {
    if payload.len() < 4 {
        return Err(ParseError::malformed("color", 4, payload.len()));
    }
    let mut buf = payload;
    let x = f64::from(buf.get_u16_le()) / XY_SCALE;
    let y = f64::from(buf.get_u16_le()) / XY_SCALE;
    Ok((x, y))
}

/// Decode the composite-state characteristic.
///
/// The payload layout is:
/// - byte 2: on/off flag (`0x01` = on)
/// - byte 5: brightness (0-255, reported as a percentage)
///
/// Other bytes are reserved and ignored.
///
/// # Errors
///
/// Returns [`ParseError::MalformedPayload`] if `payload` contains fewer than
/// [`MIN_COMPOSITE_STATE_BYTES`] (6) bytes.
pub fn decode_composite_state(payload: &[u8]) -> ParseResult<CompositeState> {
    if payload.len() < MIN_COMPOSITE_STATE_BYTES {
        return Err(ParseError::malformed(
            "bulb state",
            MIN_COMPOSITE_STATE_BYTES,
            payload.len(),
        ));
    }

    let on = payload[COMPOSITE_ON_OFFSET] == 0x01;
    let raw = f64::from(payload[COMPOSITE_BRIGHTNESS_OFFSET]);
    let brightness_percent = (raw / 255.0 * 100.0).round() as u8;

    Ok(CompositeState {
        on,
        brightness_percent,
    })
}

/// Decode a value as UTF-8 text, falling back to the raw bytes.
///
/// Never fails. Trailing NUL padding is trimmed from text values.
#[must_use]
pub fn decode_text(payload: &[u8]) -> DecodedText {
    match std::str::from_utf8(payload) {
        Ok(s) => DecodedText::Text(s.trim_end_matches('\0').to_string()),
        Err(_) => DecodedText::Raw(payload.to_vec()),
    }
}
