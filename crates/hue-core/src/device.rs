//! Bluetooth transport for Hue bulbs.
//!
//! [`BlePeripheral`] implements [`BulbTransport`] over a btleplug peripheral.
//! Every BLE operation runs under a timeout from [`ConnectionConfig`], so a
//! silent device cannot stall the session past its own bound.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::scan::{find_peripheral, get_adapter};
use crate::traits::{BulbTransport, CharacteristicFlags, CharacteristicHandle, ServiceDescriptor};
use crate::util::{create_identifier, format_peripheral_id};

/// Default timeout for BLE characteristic read operations.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE characteristic write operations.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE connection operations.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for disconnecting.
const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeouts for individual BLE operations.
///
/// These bound single operations. The whole session is bounded separately by
/// [`SupervisorConfig`](crate::SupervisorConfig).
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use hue_core::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .read_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing a BLE connection.
    pub connection_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
    /// Timeout for BLE read operations.
    pub read_timeout: Duration,
    /// Timeout for BLE write operations.
    pub write_timeout: Duration,
    /// Timeout for disconnecting.
    pub disconnect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            disconnect_timeout: DEFAULT_DISCONNECT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the disconnect timeout.
    #[must_use]
    pub fn disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.disconnect_timeout = timeout;
        self
    }
}

impl From<CharPropFlags> for CharacteristicFlags {
    fn from(props: CharPropFlags) -> Self {
        Self {
            read: props.contains(CharPropFlags::READ),
            write: props.intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE),
            notify: props.intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE),
        }
    }
}

/// A Hue bulb reached over btleplug.
///
/// The peripheral is located when the value is created, but nothing is
/// connected until [`BulbTransport::connect`] runs.
pub struct BlePeripheral {
    /// Kept alive for as long as the peripheral is in use.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    address: String,
    config: ConnectionConfig,
    /// Discovered characteristics by UUID, filled by service discovery.
    characteristics: RwLock<HashMap<Uuid, Characteristic>>,
}

impl std::fmt::Debug for BlePeripheral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlePeripheral")
            .field("address", &self.address)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BlePeripheral {
    /// Locate the bulb at `address` on the selected adapter.
    ///
    /// `adapter` selects the Bluetooth adapter (see
    /// [`get_adapter`](crate::scan::get_adapter)); the scan stops after
    /// `scan_duration`.
    #[tracing::instrument(level = "info", skip(config))]
    pub async fn locate(
        address: &str,
        adapter: Option<&str>,
        scan_duration: Duration,
        config: ConnectionConfig,
    ) -> Result<Self> {
        let adapter = get_adapter(adapter).await?;
        let peripheral = find_peripheral(&adapter, address, scan_duration).await?;
        Ok(Self::from_peripheral(adapter, peripheral, address, config).await)
    }

    /// Wrap an already discovered peripheral.
    pub async fn from_peripheral(
        adapter: Adapter,
        peripheral: Peripheral,
        requested: &str,
        config: ConnectionConfig,
    ) -> Self {
        let address = match peripheral.properties().await {
            Ok(Some(props)) => create_identifier(&props.address.to_string(), &peripheral.id()),
            _ => {
                debug!("No properties for {}, using requested address", requested);
                requested.to_string()
            }
        };

        Self {
            adapter,
            peripheral,
            address,
            config,
            characteristics: RwLock::new(HashMap::new()),
        }
    }

    /// The peripheral's platform identifier.
    pub fn peripheral_id(&self) -> String {
        format_peripheral_id(&self.peripheral.id())
    }

    /// The connection configuration in use.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    async fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        self.characteristics
            .read()
            .await
            .get(&uuid)
            .cloned()
            .ok_or(Error::CharacteristicNotFound(uuid))
    }
}

#[async_trait]
impl BulbTransport for BlePeripheral {
    fn address(&self) -> &str {
        &self.address
    }

    async fn connect(&self) -> Result<()> {
        info!("Connecting to {}...", self.address);
        timeout(self.config.connection_timeout, self.peripheral.connect())
            .await
            .map_err(|_| Error::timeout("connect to device", self.config.connection_timeout))?
            .map_err(|e| Error::connection_failed(&self.address, e.to_string()))?;
        Ok(())
    }

    async fn discover_services(&self) -> Result<Vec<ServiceDescriptor>> {
        debug!("Discovering services...");
        timeout(
            self.config.discovery_timeout,
            self.peripheral.discover_services(),
        )
        .await
        .map_err(|_| Error::timeout("discover services", self.config.discovery_timeout))??;

        let mut cache = HashMap::new();
        let mut services = Vec::new();
        for service in self.peripheral.services() {
            debug!("  Service: {}", service.uuid);
            let mut characteristics = Vec::with_capacity(service.characteristics.len());
            for characteristic in &service.characteristics {
                debug!(
                    "    Characteristic: {} {:?}",
                    characteristic.uuid, characteristic.properties
                );
                characteristics.push(CharacteristicHandle::new(
                    characteristic.uuid,
                    service.uuid,
                    characteristic.properties.into(),
                ));
                cache
                    .entry(characteristic.uuid)
                    .or_insert_with(|| characteristic.clone());
            }
            services.push(ServiceDescriptor {
                uuid: service.uuid,
                characteristics,
            });
        }

        debug!("Cached {} characteristics", cache.len());
        *self.characteristics.write().await = cache;
        Ok(services)
    }

    async fn read(&self, characteristic: &CharacteristicHandle) -> Result<Option<Vec<u8>>> {
        let target = self.find_characteristic(characteristic.uuid).await?;
        match timeout(self.config.read_timeout, self.peripheral.read(&target)).await {
            Ok(Ok(data)) => Ok(Some(data)),
            Ok(Err(e)) => {
                warn!("Read of {} failed: {}", characteristic.uuid, e);
                Ok(None)
            }
            Err(_) => {
                warn!(
                    "Read of {} timed out after {:?}",
                    characteristic.uuid, self.config.read_timeout
                );
                Ok(None)
            }
        }
    }

    async fn write(&self, characteristic: &CharacteristicHandle, value: &[u8]) -> Result<()> {
        let target = self.find_characteristic(characteristic.uuid).await?;
        let write_type = if target.properties.contains(CharPropFlags::WRITE) {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };

        timeout(
            self.config.write_timeout,
            self.peripheral.write(&target, value, write_type),
        )
        .await
        .map_err(|_| {
            Error::timeout(
                format!("write characteristic {}", characteristic.uuid),
                self.config.write_timeout,
            )
        })??;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from {}...", self.address);
        timeout(self.config.disconnect_timeout, self.peripheral.disconnect())
            .await
            .map_err(|_| Error::timeout("disconnect", self.config.disconnect_timeout))??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.connection_timeout, Duration::from_secs(15));
        assert_eq!(config.discovery_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert_eq!(config.disconnect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::new()
            .connection_timeout(Duration::from_secs(20))
            .read_timeout(Duration::from_secs(2))
            .disconnect_timeout(Duration::from_millis(500));
        assert_eq!(config.connection_timeout, Duration::from_secs(20));
        assert_eq!(config.read_timeout, Duration::from_secs(2));
        assert_eq!(config.write_timeout, DEFAULT_WRITE_TIMEOUT);
        assert_eq!(config.disconnect_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_flags_from_btleplug_properties() {
        let flags = CharacteristicFlags::from(CharPropFlags::READ | CharPropFlags::WRITE);
        assert_eq!(flags, CharacteristicFlags::READ_WRITE);

        let flags = CharacteristicFlags::from(CharPropFlags::WRITE_WITHOUT_RESPONSE);
        assert!(flags.write);
        assert!(!flags.read);

        let flags = CharacteristicFlags::from(CharPropFlags::READ | CharPropFlags::NOTIFY);
        assert!(flags.read && flags.notify && !flags.write);
    }
}
