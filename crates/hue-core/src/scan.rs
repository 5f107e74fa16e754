//! Adapter selection and locating a bulb by address.
//!
//! This client never lists devices; a scan only runs until the requested
//! address shows up or the scan bound expires.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::util::{addresses_match, format_peripheral_id};

/// Default time to scan for the requested bulb.
pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(5);

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Get a Bluetooth adapter.
///
/// With no selector the first adapter is returned. A selector is matched as
/// an adapter index (`0`, `1`, ...) or as a substring of the adapter info
/// string (e.g. `hci1` on Linux).
pub async fn get_adapter(selector: Option<&str>) -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    if adapters.is_empty() {
        return Err(Error::AdapterNotFound(
            "no Bluetooth adapters available".to_string(),
        ));
    }

    let Some(selector) = selector else {
        return adapters
            .into_iter()
            .next()
            .ok_or_else(|| Error::AdapterNotFound("no Bluetooth adapters available".to_string()));
    };

    if let Ok(index) = selector.parse::<usize>() {
        let count = adapters.len();
        return adapters.into_iter().nth(index).ok_or_else(|| {
            Error::AdapterNotFound(format!("index {} out of range ({} available)", index, count))
        });
    }

    let wanted = selector.to_lowercase();
    for adapter in adapters {
        let info = adapter.adapter_info().await.unwrap_or_default();
        debug!("Adapter: {}", info);
        if info.to_lowercase().contains(&wanted) {
            info!("Using adapter {}", info);
            return Ok(adapter);
        }
    }

    Err(Error::AdapterNotFound(selector.to_string()))
}

/// Find the peripheral with `address`, scanning for at most `duration`.
///
/// Peripherals the adapter already knows about are checked before a scan is
/// started.
#[tracing::instrument(level = "info", skip(adapter), fields(duration_secs = duration.as_secs()))]
pub async fn find_peripheral(adapter: &Adapter, address: &str, duration: Duration) -> Result<Peripheral> {
    if let Some(peripheral) = find_peripheral_by_address(adapter, address).await? {
        debug!("Found {} without scanning", address);
        return Ok(peripheral);
    }

    info!("Scanning for {}...", address);
    adapter.start_scan(ScanFilter::default()).await?;

    let deadline = Instant::now() + duration;
    let found = loop {
        match find_peripheral_by_address(adapter, address).await {
            Ok(Some(peripheral)) => break Some(peripheral),
            Ok(None) => {}
            Err(e) => warn!("Failed to list peripherals: {}", e),
        }
        if Instant::now() >= deadline {
            break None;
        }
        sleep(SCAN_POLL_INTERVAL).await;
    };

    if let Err(e) = adapter.stop_scan().await {
        warn!("Failed to stop scan: {}", e);
    }

    found.ok_or_else(|| Error::DeviceNotFound {
        address: address.to_string(),
        duration,
    })
}

/// Search the adapter's known peripherals for one matching `address`.
async fn find_peripheral_by_address(adapter: &Adapter, address: &str) -> Result<Option<Peripheral>> {
    for peripheral in adapter.peripherals().await? {
        let peripheral_id = format_peripheral_id(&peripheral.id());
        if addresses_match(&peripheral_id, address) {
            debug!("Matched by peripheral ID: {}", peripheral_id);
            return Ok(Some(peripheral));
        }

        if let Ok(Some(props)) = peripheral.properties().await {
            let candidate = props.address.to_string();
            if addresses_match(&candidate, address) {
                debug!("Matched by address: {}", candidate);
                return Ok(Some(peripheral));
            }
        }
    }
    Ok(None)
}
