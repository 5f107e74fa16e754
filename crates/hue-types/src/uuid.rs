//! Bluetooth UUIDs for Hue Bluetooth bulbs.
//!
//! This module contains the characteristic UUIDs the bulb firmware exposes
//! for light control, plus the standard Device Information characteristics
//! used to identify the bulb.

use uuid::{Uuid, uuid};

// --- Hue Light Control Service ---

/// Hue light control service.
pub const LIGHT_CONTROL_SERVICE: Uuid = uuid!("932c32bd-0000-47a2-835a-a8d455b859dd");

/// On/off switch characteristic (1 byte, `0x01` = on).
pub const LIGHT_SWITCH: Uuid = uuid!("932c32bd-0002-47a2-835a-a8d455b859dd");

/// Brightness characteristic (1 byte, 1-254 on current firmware).
pub const BRIGHTNESS: Uuid = uuid!("932c32bd-0003-47a2-835a-a8d455b859dd");

/// Color temperature characteristic (i16 LE, mired).
pub const TEMPERATURE: Uuid = uuid!("932c32bd-0004-47a2-835a-a8d455b859dd");

/// Color characteristic (two u16 LE, CIE xy scaled to 0xFFFF).
pub const COLOR: Uuid = uuid!("932c32bd-0005-47a2-835a-a8d455b859dd");

/// Combined bulb state characteristic.
pub const COMPOSITE_STATE: Uuid = uuid!("932c32bd-0007-47a2-835a-a8d455b859dd");

// --- Standard BLE Services ---

/// Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");

// --- Device Information Characteristic UUIDs ---

/// Model number string characteristic.
pub const MODEL_NUMBER: Uuid = uuid!("00002a24-0000-1000-8000-00805f9b34fb");

/// Software revision string characteristic (reported as firmware by Hue bulbs).
pub const FIRMWARE_REVISION: Uuid = uuid!("00002a28-0000-1000-8000-00805f9b34fb");

/// Manufacturer name string characteristic.
pub const MANUFACTURER_NAME: Uuid = uuid!("00002a29-0000-1000-8000-00805f9b34fb");
