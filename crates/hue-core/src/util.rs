//! Utility functions for hue-core.
//!
//! Helpers for turning btleplug peripheral identifiers into strings and for
//! comparing user-supplied device addresses.

use btleplug::platform::PeripheralId;

/// Placeholder address reported by platforms that hide MAC addresses.
pub const ZERO_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms they wrap the
/// Bluetooth address.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Pick the identifier to show for a peripheral.
///
/// Uses the Bluetooth address unless the platform reports the zero address,
/// in which case the peripheral ID is used instead.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if address == ZERO_ADDRESS {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

/// Normalize an address for comparison.
///
/// Lowercases and drops `:` and `-` separators, so `AA:BB:CC:DD:EE:FF`,
/// `aa-bb-cc-dd-ee-ff` and `aabbccddeeff` compare equal.
///
/// # Example
///
/// ```
/// use hue_core::util::normalize_address;
///
/// assert_eq!(normalize_address("AA:BB:cc:DD:ee:FF"), "aabbccddeeff");
/// ```
pub fn normalize_address(address: &str) -> String {
    address
        .trim()
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether two addresses refer to the same device.
///
/// The zero address never matches anything.
pub fn addresses_match(a: &str, b: &str) -> bool {
    let a = normalize_address(a);
    !a.is_empty() && a != normalize_address(ZERO_ADDRESS) && a == normalize_address(b)
}
