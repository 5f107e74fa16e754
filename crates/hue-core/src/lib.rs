//! Core BLE control library for Philips Hue Bluetooth bulbs.
//!
//! This crate connects to a single bulb, discovers its GATT characteristics,
//! maps them to roles, and runs one control action against them.
//!
//! # Features
//!
//! - **Transport abstraction**: [`BulbTransport`] over btleplug or the in-memory [`MockBulb`]
//! - **Characteristic registry**: discovered UUIDs mapped to [`Role`]s, first binding wins
//! - **Session state machine**: connect, discover, execute, with a one-shot outcome
//! - **Supervisor**: bounds the whole command and aborts the session on expiry
//! - **Actions**: switch, brightness, temperature, xy and RGB color, introspection, state
//!
//! # Platform Differences
//!
//! - **Linux/Windows**: bulbs are identified by their Bluetooth MAC address
//!   (e.g., `AA:BB:CC:DD:EE:FF`).
//! - **macOS**: CoreBluetooth hides MAC addresses; pass the peripheral UUID
//!   reported by the system instead.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use hue_core::{Action, BlePeripheral, ConnectionConfig, Supervisor, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let action = Action::parse("brightness", &["128".to_string()])?;
//!     let locate = async {
//!         BlePeripheral::locate(
//!             "AA:BB:CC:DD:EE:FF",
//!             None,
//!             Duration::from_secs(5),
//!             ConnectionConfig::default(),
//!         )
//!         .await
//!         .map(Arc::new)
//!     };
//!
//!     // Finding the bulb and running the session share the 10s bound
//!     let outcome = Supervisor::new(SupervisorConfig::default())
//!         .locate_and_run(locate, action)
//!         .await;
//!     println!("{}", outcome);
//!     std::process::exit(outcome.exit_code());
//! }
//! ```

pub mod device;
pub mod dispatcher;
pub mod error;
pub mod mock;
pub mod registry;
pub mod scan;
pub mod session;
pub mod supervisor;
pub mod traits;
pub mod util;

// Core exports
pub use device::{BlePeripheral, ConnectionConfig};
pub use dispatcher::{Action, ActionReport, CharacteristicReport, Dispatcher, Reading, ServiceReport};
pub use error::{Error, Result, UNREADABLE_REMEDIATION};
pub use mock::{MockBulb, MockBulbBuilder};
pub use registry::{GamutContext, Registry};
pub use session::{Session, SessionOutcome, SessionState};
pub use supervisor::{Supervisor, SupervisorConfig};
pub use traits::{BulbTransport, CharacteristicFlags, CharacteristicHandle, ServiceDescriptor};

// Re-export from hue-types
pub use hue_types::uuid as uuids;
pub use hue_types::{CompositeState, DecodedText, Gamut, Role, XyPoint};
