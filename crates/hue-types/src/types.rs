//! Core types for Hue bulb control.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::uuid as uuids;

/// Semantic role of a discovered characteristic.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new roles
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum Role {
    /// On/off switch.
    LightSwitch,
    /// Brightness level.
    Brightness,
    /// Color temperature in mired.
    Temperature,
    /// CIE xy color.
    Color,
    /// Model number string.
    Model,
    /// Manufacturer name string.
    Manufacturer,
    /// Firmware version string.
    Firmware,
    /// Combined on/off and brightness state.
    CompositeState,
    /// Characteristic not used by this client.
    Unknown,
}

impl Role {
    /// All roles that can be bound to a characteristic.
    pub const BINDABLE: [Role; 8] = [
        Role::LightSwitch,
        Role::Brightness,
        Role::Temperature,
        Role::Color,
        Role::Model,
        Role::Manufacturer,
        Role::Firmware,
        Role::CompositeState,
    ];

    /// Map a characteristic UUID to its role.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_types::{Role, uuids};
    ///
    /// assert_eq!(Role::from_uuid(&uuids::LIGHT_SWITCH), Role::LightSwitch);
    /// assert_eq!(Role::from_uuid(&uuid::Uuid::nil()), Role::Unknown);
    /// ```
    #[must_use]
    pub fn from_uuid(uuid: &Uuid) -> Self {
        match *uuid {
            uuids::LIGHT_SWITCH => Role::LightSwitch,
            uuids::BRIGHTNESS => Role::Brightness,
            uuids::TEMPERATURE => Role::Temperature,
            uuids::COLOR => Role::Color,
            uuids::MODEL_NUMBER => Role::Model,
            uuids::MANUFACTURER_NAME => Role::Manufacturer,
            uuids::FIRMWARE_REVISION => Role::Firmware,
            uuids::COMPOSITE_STATE => Role::CompositeState,
            _ => Role::Unknown,
        }
    }

    /// The characteristic UUID this role binds to, if any.
    #[must_use]
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            Role::LightSwitch => Some(uuids::LIGHT_SWITCH),
            Role::Brightness => Some(uuids::BRIGHTNESS),
            Role::Temperature => Some(uuids::TEMPERATURE),
            Role::Color => Some(uuids::COLOR),
            Role::Model => Some(uuids::MODEL_NUMBER),
            Role::Manufacturer => Some(uuids::MANUFACTURER_NAME),
            Role::Firmware => Some(uuids::FIRMWARE_REVISION),
            Role::CompositeState => Some(uuids::COMPOSITE_STATE),
            Role::Unknown => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::LightSwitch => write!(f, "light switch"),
            Role::Brightness => write!(f, "brightness"),
            Role::Temperature => write!(f, "temperature"),
            Role::Color => write!(f, "color"),
            Role::Model => write!(f, "model"),
            Role::Manufacturer => write!(f, "manufacturer"),
            Role::Firmware => write!(f, "firmware"),
            Role::CompositeState => write!(f, "bulb state"),
            Role::Unknown => write!(f, "unknown"),
        }
    }
}

/// Combined bulb state decoded from the composite-state characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompositeState {
    /// Whether the light is on.
    pub on: bool,
    /// Brightness as a percentage (0-100).
    pub brightness_percent: u8,
}

impl fmt::Display for CompositeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}%",
            if self.on { "ON" } else { "OFF" },
            self.brightness_percent
        )
    }
}

/// Result of a best-effort text decode.
///
/// Values that are not valid UTF-8 are kept as raw bytes for display.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value", rename_all = "snake_case"))]
pub enum DecodedText {
    /// Valid UTF-8 text.
    Text(String),
    /// Raw bytes that could not be decoded.
    Raw(Vec<u8>),
}

impl DecodedText {
    /// Returns the text if the value decoded as UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DecodedText::Text(s) => Some(s),
            DecodedText::Raw(_) => None,
        }
    }
}

impl fmt::Display for DecodedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedText::Text(s) => write!(f, "{}", s),
            DecodedText::Raw(bytes) => write!(f, "{}", format_bytes(bytes)),
        }
    }
}

/// Format bytes as a bracketed hex list, e.g. `[01 fe 00]`.
pub fn format_bytes(bytes: &[u8]) -> String {
    let hex: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("[{}]", hex.join(" "))
}
