//! Characteristic registry.
//!
//! Maps discovered characteristics to the roles the dispatcher works with.
//! The registry is filled once, right after service discovery, and is only
//! read afterwards.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use hue_types::codec::decode_text;
use hue_types::color::{Gamut, gamut_for_model};
use hue_types::{DecodedText, Role};

use crate::error::{Error, Result};
use crate::traits::{BulbTransport, CharacteristicHandle, ServiceDescriptor};

/// Role to characteristic bindings for one session.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    bindings: BTreeMap<Role, CharacteristicHandle>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from discovered services.
    pub fn from_services(services: &[ServiceDescriptor]) -> Self {
        let mut registry = Self::new();
        for service in services {
            for characteristic in &service.characteristics {
                registry.bind(characteristic.clone());
            }
        }
        debug!("Bound {} of {} roles", registry.len(), Role::BINDABLE.len());
        registry
    }

    /// Bind a characteristic to its role.
    ///
    /// Unrecognised identifiers are ignored. If a role is already bound the
    /// first binding is kept. Returns the role the characteristic was bound
    /// to, if any.
    pub fn bind(&mut self, characteristic: CharacteristicHandle) -> Option<Role> {
        let role = Role::from_uuid(&characteristic.uuid);
        if role == Role::Unknown {
            debug!("Skipping unmapped characteristic {}", characteristic.uuid);
            return None;
        }

        if let Some(existing) = self.bindings.get(&role) {
            warn!(
                "Ignoring duplicate {} characteristic in service {} (already bound in {})",
                role, characteristic.service, existing.service
            );
            return None;
        }

        debug!("Bound {} -> {}", role, characteristic.uuid);
        self.bindings.insert(role, characteristic);
        Some(role)
    }

    /// Resolve the characteristic bound to `role`.
    pub fn resolve(&self, role: Role) -> Result<&CharacteristicHandle> {
        self.bindings.get(&role).ok_or(Error::RoleNotBound { role })
    }

    /// Number of bound roles.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no role is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Gamut used for RGB conversion, derived from the bulb's model number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamutContext {
    /// Gamut used for conversions.
    pub gamut: Gamut,
    /// Model number as read from the device, if it could be read.
    pub model: Option<DecodedText>,
    /// Whether the gamut came from the fallback rather than the model table.
    pub fallback: bool,
}

impl GamutContext {
    /// Context using the default gamut.
    pub fn fallback(model: Option<DecodedText>) -> Self {
        Self {
            gamut: Gamut::default(),
            model,
            fallback: true,
        }
    }

    /// Derive the context from a model number value.
    pub fn from_model(model: DecodedText) -> Self {
        match model.as_text().and_then(gamut_for_model) {
            Some(gamut) => Self {
                gamut,
                model: Some(model),
                fallback: false,
            },
            None => {
                debug!("Model {} not in gamut table, using default", model);
                Self::fallback(Some(model))
            }
        }
    }

    /// Read the model characteristic and look up its gamut.
    ///
    /// Never fails: an unbound, unreadable, or unknown model falls back to
    /// the default gamut.
    pub async fn load<T: BulbTransport + ?Sized>(transport: &T, registry: &Registry) -> Self {
        let handle = match registry.resolve(Role::Model) {
            Ok(handle) => handle,
            Err(_) => {
                debug!("No model characteristic, using default gamut");
                return Self::fallback(None);
            }
        };

        match transport.read(handle).await {
            Ok(Some(value)) => Self::from_model(decode_text(&value)),
            Ok(None) => {
                warn!("Model characteristic returned no value, using default gamut");
                Self::fallback(None)
            }
            Err(e) => {
                warn!("Failed to read model characteristic ({}), using default gamut", e);
                Self::fallback(None)
            }
        }
    }
}

impl fmt::Display for GamutContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gamut)?;
        match (&self.model, self.fallback) {
            (Some(model), false) => write!(f, " for model {}", model),
            (Some(model), true) => write!(f, " (default, model {} not recognised)", model),
            (None, _) => write!(f, " (default, model unknown)"),
        }
    }
}
