//! Error types for hue-core.
//!
//! This module defines every error that can end a bulb control session.
//!
//! # Error Classification
//!
//! | Error Type | User-facing meaning |
//! |------------|---------------------|
//! | [`Error::ConnectionFailed`] | The link to the bulb could not be established |
//! | [`Error::DiscoveryIncomplete`] | Services never resolved before the deadline |
//! | [`Error::RoleNotBound`] | The bulb does not expose a characteristic the action needs |
//! | [`Error::MalformedPayload`] | A value was too short to decode |
//! | [`Error::DeviceUnreachable`] | A read returned no value (pairing or firmware issue) |
//! | [`Error::UnknownAction`] | The action name is not recognised |
//! | [`Error::InvalidArguments`] | The action's arguments are missing or unparseable |
//!
//! None of these are retried inside the core. A failed read or write ends the
//! action and is reported as the session outcome.

use std::time::Duration;

use thiserror::Error;

use hue_types::{ParseError, Role};

use crate::session::SessionState;

/// Guidance shown when the light switch characteristic cannot be read.
pub const UNREADABLE_REMEDIATION: &str = "If this is the first pairing you may need to perform a \
     firmware reset using the Philips Hue mobile app and connect again: \
     https://www.reddit.com/r/Hue/comments/eq0y3y/philips_hue_bluetooth_developer_documentation/";

/// Errors that can occur while controlling a bulb.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// The transport could not establish the link.
    #[error("Connection to {address} failed: {reason}")]
    ConnectionFailed {
        /// Target device address.
        address: String,
        /// What went wrong.
        reason: String,
    },

    /// No usable Bluetooth adapter.
    #[error("Bluetooth adapter not found: {0}")]
    AdapterNotFound(String),

    /// The device was not seen during the scan.
    #[error("Device {address} not found after scanning for {duration:?}")]
    DeviceNotFound {
        /// Requested device address.
        address: String,
        /// How long the scan ran.
        duration: Duration,
    },

    /// A characteristic is not among the discovered ones.
    #[error("Characteristic {0} not found on device")]
    CharacteristicNotFound(uuid::Uuid),

    /// Service discovery did not complete.
    #[error("Service discovery for {address} did not complete: {reason}")]
    DiscoveryIncomplete {
        /// Target device address.
        address: String,
        /// What went wrong.
        reason: String,
    },

    /// The action needs a characteristic the device did not advertise.
    #[error("The device does not expose a {role} characteristic")]
    RoleNotBound {
        /// The missing role.
        role: Role,
    },

    /// A value read from the device could not be decoded.
    #[error(transparent)]
    MalformedPayload(#[from] ParseError),

    /// A characteristic read returned no value.
    #[error("Could not read the {role} characteristic. {}", UNREADABLE_REMEDIATION)]
    DeviceUnreachable {
        /// The role that could not be read.
        role: Role,
    },

    /// The action name is not one of the supported actions.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The action's arguments are missing or invalid.
    #[error("Invalid arguments for '{action}': {reason}")]
    InvalidArguments {
        /// The action being parsed.
        action: String,
        /// Why the arguments were rejected.
        reason: String,
    },

    /// Operation attempted while not connected to the device.
    #[error("Not connected to device")]
    NotConnected,

    /// A transport operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// The session was asked to make a transition its state machine forbids.
    #[error("Invalid session transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current state.
        from: SessionState,
        /// Requested state.
        to: SessionState,
    },

    /// The session task ended without reporting an outcome.
    #[error("Session ended without reporting an outcome: {reason}")]
    SessionAborted {
        /// Why the session ended (panic message or cancellation).
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a connection failure.
    pub fn connection_failed(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a discovery failure.
    pub fn discovery_incomplete(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DiscoveryIncomplete {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an invalid arguments error.
    pub fn invalid_arguments(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by bad user input rather than the device.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Error::UnknownAction(_) | Error::InvalidArguments { .. })
    }
}

/// Result type alias using hue-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection_failed("AA:BB:CC:DD:EE:FF", "host is down");
        assert!(err.to_string().contains("AA:BB:CC:DD:EE:FF"));
        assert!(err.to_string().contains("host is down"));

        let err = Error::RoleNotBound { role: Role::Color };
        assert_eq!(
            err.to_string(),
            "The device does not expose a color characteristic"
        );

        let err = Error::UnknownAction("foobar".to_string());
        assert_eq!(err.to_string(), "Unknown action: foobar");

        let err = Error::timeout("read characteristic", Duration::from_secs(10));
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn test_device_unreachable_carries_remediation() {
        let err = Error::DeviceUnreachable {
            role: Role::LightSwitch,
        };
        let msg = err.to_string();
        assert!(msg.contains("light switch"));
        assert!(msg.contains("firmware reset"));
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = ParseError::malformed("bulb state", 6, 2).into();
        assert!(matches!(err, Error::MalformedPayload(_)));
        assert!(err.to_string().contains("requires 6 bytes"));
    }

    #[test]
    fn test_usage_errors() {
        assert!(Error::UnknownAction("x".into()).is_usage_error());
        assert!(Error::invalid_arguments("brightness", "missing value").is_usage_error());
        assert!(!Error::NotConnected.is_usage_error());
    }

    #[test]
    fn test_btleplug_error_conversion() {
        fn _assert_from_impl<T: From<btleplug::Error>>() {}
        _assert_from_impl::<Error>();
    }
}
