//! Platform-agnostic types for Hue Bluetooth bulbs.
//!
//! This crate holds everything about the bulb protocol that does not need a
//! Bluetooth stack, so it can be tested and reused on its own.
//!
//! # Features
//!
//! - Characteristic UUIDs and the UUID to [`Role`] table
//! - Binary codecs for switch, brightness, temperature, color and bulb state
//! - RGB to CIE xy conversion with per-model gamut lookup
//! - Error types for payload decoding
//!
//! # Example
//!
//! ```
//! use hue_types::codec::{decode_composite_state, encode_temperature};
//!
//! assert_eq!(encode_temperature(1000), encode_temperature(454));
//!
//! let state = decode_composite_state(&[0, 0, 1, 0, 0, 255]).unwrap();
//! assert!(state.on);
//! assert_eq!(state.brightness_percent, 100);
//! ```

pub mod codec;
pub mod color;
pub mod error;
pub mod types;
pub mod uuid;

pub use color::{Gamut, XyPoint};
pub use error::{ParseError, ParseResult};
pub use types::{CompositeState, DecodedText, Role, format_bytes};
pub use uuid as uuids;
