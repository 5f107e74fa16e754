//! Mock bulb implementation for testing.
//!
//! This module provides an in-memory bulb that can be used for unit and
//! integration testing without requiring actual BLE hardware.
//!
//! The [`MockBulb`] implements the [`BulbTransport`] trait, so it can drive a
//! [`Session`](crate::Session) or [`Supervisor`](crate::Supervisor) exactly
//! like a real peripheral.
//!
//! # Features
//!
//! - **Failure injection**: fail the connect, fail or hang service discovery,
//!   hang the disconnect
//! - **Unreadable characteristics**: reads that answer without a value
//! - **Latency simulation**: add artificial delays to every operation
//! - **I/O accounting**: count reads, writes, connects and disconnects

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use hue_types::codec::{encode_color_xy, encode_switch, encode_temperature};
use hue_types::{Role, uuids};

use crate::error::{Error, Result};
use crate::traits::{BulbTransport, CharacteristicFlags, CharacteristicHandle, ServiceDescriptor};

/// Default address used by mock bulbs.
pub const MOCK_ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

/// A vendor characteristic the client does not map to a role.
const UNMAPPED_CHARACTERISTIC: Uuid = uuid::uuid!("932c32bd-0006-47a2-835a-a8d455b859dd");

/// A mock Hue bulb for testing.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use hue_core::{Action, MockBulb, Session, SessionOutcome};
///
/// #[tokio::main]
/// async fn main() {
///     let bulb = Arc::new(MockBulb::standard_hue().with_switch(false).build());
///     let outcome = Session::new(bulb.clone(), Action::Toggle).run().await;
///     assert!(outcome.is_completed());
///     assert_eq!(bulb.writes().await[0].1, vec![0x01]);
/// }
/// ```
pub struct MockBulb {
    address: String,
    services: Vec<ServiceDescriptor>,
    values: RwLock<HashMap<Uuid, Vec<u8>>>,
    unreadable: HashSet<Uuid>,
    reads: RwLock<Vec<Uuid>>,
    writes: RwLock<Vec<(Uuid, Vec<u8>)>>,
    connected: AtomicBool,
    fail_connect: bool,
    fail_discovery: bool,
    hang_discovery: bool,
    hang_disconnect: bool,
    latency: Duration,
    connect_count: AtomicU32,
    disconnect_count: AtomicU32,
    read_count: AtomicU32,
    write_count: AtomicU32,
}

impl std::fmt::Debug for MockBulb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBulb")
            .field("address", &self.address)
            .field("services", &self.services.len())
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockBulb {
    /// Start building a bulb with no services.
    pub fn builder() -> MockBulbBuilder {
        MockBulbBuilder::default()
    }

    /// Start building a bulb that exposes the full Hue control and device
    /// information services.
    ///
    /// The light is off, brightness is 254, the model is `LCA001`.
    pub fn standard_hue() -> MockBulbBuilder {
        let rw = CharacteristicFlags::READ_WRITE;
        let ro = CharacteristicFlags::READ_ONLY;
        let control = uuids::LIGHT_CONTROL_SERVICE;
        let info = uuids::DEVICE_INFO_SERVICE;

        MockBulbBuilder::default()
            .with_characteristic(control, uuids::LIGHT_SWITCH, rw, Some(encode_switch(false).to_vec()))
            .with_characteristic(control, uuids::BRIGHTNESS, rw, Some(vec![0xFE]))
            .with_characteristic(
                control,
                uuids::TEMPERATURE,
                rw,
                Some(encode_temperature(366).to_vec()),
            )
            .with_characteristic(
                control,
                uuids::COLOR,
                rw,
                Some(encode_color_xy(0.3127, 0.329).to_vec()),
            )
            .with_characteristic(
                control,
                uuids::COMPOSITE_STATE,
                ro,
                Some(vec![0x00, 0x00, 0x00, 0x00, 0x00, 0xFE]),
            )
            .with_characteristic(control, UNMAPPED_CHARACTERISTIC, rw, Some(vec![0x00, 0x00]))
            .with_characteristic(
                info,
                uuids::MANUFACTURER_NAME,
                ro,
                Some(b"Signify Netherlands B.V.".to_vec()),
            )
            .with_characteristic(info, uuids::MODEL_NUMBER, ro, Some(b"LCA001".to_vec()))
            .with_characteristic(info, uuids::FIRMWARE_REVISION, ro, Some(b"1.104.2".to_vec()))
    }

    /// Whether the bulb is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Number of connect attempts.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::Relaxed)
    }

    /// Number of disconnects.
    pub fn disconnect_count(&self) -> u32 {
        self.disconnect_count.load(Ordering::Relaxed)
    }

    /// Number of characteristic reads.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Number of characteristic writes.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Total characteristic reads and writes.
    pub fn io_count(&self) -> u32 {
        self.read_count() + self.write_count()
    }

    /// Every write so far, in order.
    pub async fn writes(&self) -> Vec<(Uuid, Vec<u8>)> {
        self.writes.read().await.clone()
    }

    /// Every characteristic read so far, in order.
    pub async fn reads(&self) -> Vec<Uuid> {
        self.reads.read().await.clone()
    }

    /// The current value of a characteristic.
    pub async fn value(&self, uuid: &Uuid) -> Option<Vec<u8>> {
        self.values.read().await.get(uuid).cloned()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn check_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

#[async_trait]
impl BulbTransport for MockBulb {
    fn address(&self) -> &str {
        &self.address
    }

    async fn connect(&self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;

        if self.fail_connect {
            return Err(Error::connection_failed(&self.address, "mock connect failure"));
        }
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn discover_services(&self) -> Result<Vec<ServiceDescriptor>> {
        self.check_connected()?;
        self.simulate_latency().await;

        if self.hang_discovery {
            std::future::pending::<()>().await;
        }
        if self.fail_discovery {
            return Err(Error::discovery_incomplete(
                &self.address,
                "mock discovery failure",
            ));
        }
        Ok(self.services.clone())
    }

    async fn read(&self, characteristic: &CharacteristicHandle) -> Result<Option<Vec<u8>>> {
        self.check_connected()?;
        self.read_count.fetch_add(1, Ordering::Relaxed);
        self.reads.write().await.push(characteristic.uuid);
        self.simulate_latency().await;

        if self.unreadable.contains(&characteristic.uuid) {
            return Ok(None);
        }
        Ok(self.values.read().await.get(&characteristic.uuid).cloned())
    }

    async fn write(&self, characteristic: &CharacteristicHandle, value: &[u8]) -> Result<()> {
        self.check_connected()?;
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;

        self.writes
            .write()
            .await
            .push((characteristic.uuid, value.to_vec()));
        self.values
            .write()
            .await
            .insert(characteristic.uuid, value.to_vec());
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_count.fetch_add(1, Ordering::Relaxed);
        if self.hang_disconnect {
            std::future::pending::<()>().await;
        }
        self.connected.store(false, Ordering::Relaxed);
        Ok(())
    }
}

/// Builder for creating mock bulbs with custom characteristics and behavior.
#[derive(Debug, Default)]
pub struct MockBulbBuilder {
    address: Option<String>,
    services: Vec<ServiceDescriptor>,
    values: HashMap<Uuid, Vec<u8>>,
    unreadable: HashSet<Uuid>,
    fail_connect: bool,
    fail_discovery: bool,
    hang_discovery: bool,
    hang_disconnect: bool,
    latency: Duration,
}

impl MockBulbBuilder {
    /// Set the device address.
    #[must_use]
    pub fn address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Add a characteristic, creating its service if needed.
    #[must_use]
    pub fn with_characteristic(
        mut self,
        service: Uuid,
        uuid: Uuid,
        flags: CharacteristicFlags,
        value: Option<Vec<u8>>,
    ) -> Self {
        let handle = CharacteristicHandle::new(uuid, service, flags);
        match self.services.iter_mut().find(|s| s.uuid == service) {
            Some(existing) => existing.characteristics.push(handle),
            None => self.services.push(ServiceDescriptor {
                uuid: service,
                characteristics: vec![handle],
            }),
        }
        if let Some(value) = value {
            self.values.insert(uuid, value);
        }
        self
    }

    /// Replace the stored value of a characteristic.
    #[must_use]
    pub fn with_value(mut self, uuid: Uuid, value: Vec<u8>) -> Self {
        self.values.insert(uuid, value);
        self
    }

    /// Set the light switch value.
    #[must_use]
    pub fn with_switch(self, on: bool) -> Self {
        self.with_value(uuids::LIGHT_SWITCH, encode_switch(on).to_vec())
    }

    /// Set the model number string.
    #[must_use]
    pub fn with_model(self, model: &str) -> Self {
        self.with_value(uuids::MODEL_NUMBER, model.as_bytes().to_vec())
    }

    /// Remove the characteristic bound to `role`.
    #[must_use]
    pub fn without_role(mut self, role: Role) -> Self {
        if let Some(uuid) = role.uuid() {
            for service in &mut self.services {
                service.characteristics.retain(|c| c.uuid != uuid);
            }
            self.values.remove(&uuid);
        }
        self
    }

    /// Make reads of `role` answer without a value.
    #[must_use]
    pub fn unreadable(mut self, role: Role) -> Self {
        if let Some(uuid) = role.uuid() {
            self.unreadable.insert(uuid);
        }
        self
    }

    /// Fail every connect attempt.
    #[must_use]
    pub fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Fail service discovery.
    #[must_use]
    pub fn fail_discovery(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    /// Never complete service discovery.
    #[must_use]
    pub fn hang_discovery(mut self) -> Self {
        self.hang_discovery = true;
        self
    }

    /// Never complete a disconnect.
    #[must_use]
    pub fn hang_disconnect(mut self) -> Self {
        self.hang_disconnect = true;
        self
    }

    /// Delay every operation by `latency`.
    #[must_use]
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Build the mock bulb.
    #[must_use]
    pub fn build(self) -> MockBulb {
        MockBulb {
            address: self.address.unwrap_or_else(|| MOCK_ADDRESS.to_string()),
            services: self.services,
            values: RwLock::new(self.values),
            unreadable: self.unreadable,
            reads: RwLock::new(Vec::new()),
            writes: RwLock::new(Vec::new()),
            connected: AtomicBool::new(false),
            fail_connect: self.fail_connect,
            fail_discovery: self.fail_discovery,
            hang_discovery: self.hang_discovery,
            hang_disconnect: self.hang_disconnect,
            latency: self.latency,
            connect_count: AtomicU32::new(0),
            disconnect_count: AtomicU32::new(0),
            read_count: AtomicU32::new(0),
            write_count: AtomicU32::new(0),
        }
    }
}
