//! Error types for data parsing in hue-types.

use thiserror::Error;

/// Errors that can occur when decoding values read from a bulb.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in hue-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Payload shorter than the layout requires.
    #[error("Malformed payload: {what} requires {expected} bytes, got {actual}")]
    MalformedPayload {
        /// Which layout was being decoded.
        what: &'static str,
        /// Minimum number of bytes required.
        expected: usize,
        /// Number of bytes received.
        actual: usize,
    },
}

impl ParseError {
    /// Create a malformed payload error.
    pub fn malformed(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::MalformedPayload {
            what,
            expected,
            actual,
        }
    }
}

/// Result type alias using hue-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
