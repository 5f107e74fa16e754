//! Trait abstractions for the BLE transport.
//!
//! This module provides the [`BulbTransport`] trait that abstracts over the
//! real Bluetooth peripheral and the in-memory mock used in tests. The core
//! only needs four capabilities from a transport: connect, discover services,
//! read a characteristic, write a characteristic.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;

/// Access flags advertised by a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CharacteristicFlags {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

impl CharacteristicFlags {
    /// Flags for a characteristic that can be read and written.
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
        notify: false,
    };

    /// Flags for a read-only characteristic.
    pub const READ_ONLY: Self = Self {
        read: true,
        write: false,
        notify: false,
    };
}

/// Reference to a characteristic owned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacteristicHandle {
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// UUID of the service the characteristic belongs to.
    pub service: Uuid,
    /// Advertised access flags.
    pub flags: CharacteristicFlags,
}

impl CharacteristicHandle {
    pub fn new(uuid: Uuid, service: Uuid, flags: CharacteristicFlags) -> Self {
        Self {
            uuid,
            service,
            flags,
        }
    }
}

/// A discovered GATT service and its characteristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub uuid: Uuid,
    pub characteristics: Vec<CharacteristicHandle>,
}

/// Capability set the control session consumes from a BLE stack.
///
/// # Example
///
/// ```ignore
/// use hue_core::{BulbTransport, Result};
///
/// async fn dump<T: BulbTransport>(transport: &T) -> Result<()> {
///     transport.connect().await?;
///     for service in transport.discover_services().await? {
///         println!("service {}", service.uuid);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait BulbTransport: Send + Sync {
    /// The device address this transport talks to.
    fn address(&self) -> &str;

    /// Establish the link to the device.
    async fn connect(&self) -> Result<()>;

    /// Discover services and characteristics.
    ///
    /// Completes once the device reports its services as resolved.
    async fn discover_services(&self) -> Result<Vec<ServiceDescriptor>>;

    /// Read a characteristic value.
    ///
    /// Returns `Ok(None)` when the device answered without a value. Callers
    /// that need the value treat this as the device being unreachable.
    async fn read(&self, characteristic: &CharacteristicHandle) -> Result<Option<Vec<u8>>>;

    /// Write a characteristic value.
    async fn write(&self, characteristic: &CharacteristicHandle, value: &[u8]) -> Result<()>;

    /// Disconnect from the device.
    async fn disconnect(&self) -> Result<()>;
}
