//! Action parsing and execution.
//!
//! [`Action::parse`] validates the action name and its arguments before any
//! connection is made. [`Dispatcher::execute`] then runs the action against a
//! connected transport, using the [`Registry`] to find characteristics, the
//! session's [`GamutContext`] for RGB conversion, and the codec to build and
//! decode payloads.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info, warn};

use hue_types::codec::{
    self, decode_brightness, decode_color_xy, decode_composite_state, decode_switch,
    decode_temperature, decode_text,
};
use hue_types::color::rgb_to_xy;
use hue_types::{CompositeState, DecodedText, Gamut, ParseResult, Role, XyPoint, format_bytes};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::registry::{GamutContext, Registry};
use crate::traits::{BulbTransport, CharacteristicFlags, CharacteristicHandle, ServiceDescriptor};

/// A validated bulb action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Flip the light switch.
    Toggle,
    /// Turn the light on.
    SwitchOn,
    /// Turn the light off.
    SwitchOff,
    /// Set the raw brightness level.
    Brightness(u8),
    /// Set the color temperature in mired. Out-of-range values are clamped.
    Temperature(i32),
    /// Set the color from CIE xy coordinates.
    ColorXy { x: f64, y: f64 },
    /// Set the color from RGB channels (0-255).
    Color { red: f64, green: f64, blue: f64 },
    /// List every service and characteristic with its value.
    Introspect,
    /// Report device information and the current bulb state.
    State,
}

impl Action {
    /// Names accepted by [`Action::parse`], in usage order.
    pub const NAMES: [&'static str; 9] = [
        "toggle",
        "switch_on",
        "switch_off",
        "brightness",
        "temperature",
        "col_xy",
        "color",
        "introspect",
        "state",
    ];

    /// Parse an action name and its positional arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAction`] for an unrecognised name and
    /// [`Error::InvalidArguments`] when the argument count or values are
    /// wrong.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_core::Action;
    ///
    /// let action = Action::parse("brightness", &["128".to_string()]).unwrap();
    /// assert_eq!(action, Action::Brightness(128));
    /// assert!(Action::parse("foobar", &[]).is_err());
    /// ```
    pub fn parse(name: &str, args: &[String]) -> Result<Self> {
        match name {
            "toggle" => expect_args::<0>(name, args).map(|_| Action::Toggle),
            "switch_on" => expect_args::<0>(name, args).map(|_| Action::SwitchOn),
            "switch_off" => expect_args::<0>(name, args).map(|_| Action::SwitchOff),
            "introspect" => expect_args::<0>(name, args).map(|_| Action::Introspect),
            "state" => expect_args::<0>(name, args).map(|_| Action::State),
            "brightness" => {
                let [level] = expect_args::<1>(name, args)?;
                let level = parse_number::<u8>(name, "level", level, "an integer from 0 to 255")?;
                Ok(Action::Brightness(level))
            }
            "temperature" => {
                let [mired] = expect_args::<1>(name, args)?;
                let mired = parse_number::<i32>(name, "mired", mired, "an integer")?;
                Ok(Action::Temperature(mired))
            }
            "col_xy" => {
                let [x, y] = expect_args::<2>(name, args)?;
                let x = parse_in_range(name, "x", x, 0.0, 1.0)?;
                let y = parse_in_range(name, "y", y, 0.0, 1.0)?;
                Ok(Action::ColorXy { x, y })
            }
            "color" => {
                let [red, green, blue] = expect_args::<3>(name, args)?;
                Ok(Action::Color {
                    red: parse_in_range(name, "red", red, 0.0, 255.0)?,
                    green: parse_in_range(name, "green", green, 0.0, 255.0)?,
                    blue: parse_in_range(name, "blue", blue, 0.0, 255.0)?,
                })
            }
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }

    /// The action's command-line name.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Toggle => "toggle",
            Action::SwitchOn => "switch_on",
            Action::SwitchOff => "switch_off",
            Action::Brightness(_) => "brightness",
            Action::Temperature(_) => "temperature",
            Action::ColorXy { .. } => "col_xy",
            Action::Color { .. } => "color",
            Action::Introspect => "introspect",
            Action::State => "state",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Brightness(level) => write!(f, "brightness {}", level),
            Action::Temperature(mired) => write!(f, "temperature {}", mired),
            Action::ColorXy { x, y } => write!(f, "col_xy {} {}", x, y),
            Action::Color { red, green, blue } => write!(f, "color {} {} {}", red, green, blue),
            other => write!(f, "{}", other.name()),
        }
    }
}

fn expect_args<'a, const N: usize>(action: &str, args: &'a [String]) -> Result<[&'a str; N]> {
    if args.len() != N {
        return Err(Error::invalid_arguments(
            action,
            format!("expected {} argument(s), got {}", N, args.len()),
        ));
    }
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

fn parse_number<T: FromStr>(action: &str, what: &str, value: &str, expected: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        Error::invalid_arguments(action, format!("{} must be {}, got '{}'", what, expected, value))
    })
}

fn parse_in_range(action: &str, what: &str, value: &str, min: f64, max: f64) -> Result<f64> {
    let expected = format!("a number from {} to {}", min, max);
    let parsed = parse_number::<f64>(action, what, value, &expected)?;
    if !parsed.is_finite() || parsed < min || parsed > max {
        return Err(Error::invalid_arguments(
            action,
            format!("{} must be {}, got '{}'", what, expected, value),
        ));
    }
    Ok(parsed)
}

/// Outcome of reading a value back for reporting.
///
/// Read-back never fails an action; a value that cannot be read or decoded
/// is reported as such.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Reading<T> {
    /// The value was read and decoded.
    Value(T),
    /// The value was read but could not be decoded.
    Raw(Vec<u8>),
    /// No value could be read.
    Unreadable,
}

impl<T> Reading<T> {
    /// The decoded value, if there is one.
    pub fn value(&self) -> Option<&T> {
        match self {
            Reading::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Reading<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Value(v) => write!(f, "{}", v),
            Reading::Raw(bytes) => write!(f, "{}", format_bytes(bytes)),
            Reading::Unreadable => write!(f, "unreadable"),
        }
    }
}

/// A characteristic as reported by `introspect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacteristicReport {
    pub uuid: Uuid,
    pub role: Role,
    pub flags: CharacteristicFlags,
    pub value: Reading<DecodedText>,
}

/// A service as reported by `introspect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceReport {
    pub uuid: Uuid,
    pub characteristics: Vec<CharacteristicReport>,
}

/// Result of a completed action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionReport {
    /// Result of `toggle`, `switch_on` or `switch_off`.
    Switch { was_on: bool, is_on: bool },
    /// Result of `brightness`.
    Brightness { written: u8, read_back: Reading<u8> },
    /// Result of `temperature`.
    Temperature {
        requested: i32,
        written: i16,
        read_back: Reading<i16>,
    },
    /// Result of `col_xy`.
    ColorXy {
        written: XyPoint,
        read_back: Reading<XyPoint>,
    },
    /// Result of `color`.
    Color {
        rgb: [f64; 3],
        gamut: Gamut,
        /// The model was unknown or unreadable and the default gamut was used.
        gamut_fallback: bool,
        written: XyPoint,
        read_back: Reading<XyPoint>,
    },
    /// Result of `introspect`.
    Introspect { services: Vec<ServiceReport> },
    /// Result of `state`.
    State {
        manufacturer: Reading<DecodedText>,
        model: Reading<DecodedText>,
        firmware: Reading<DecodedText>,
        state: Reading<CompositeState>,
    },
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

impl fmt::Display for ActionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionReport::Switch { was_on, is_on } => {
                write!(f, "Light switched {} (was {})", on_off(*is_on), on_off(*was_on))
            }
            ActionReport::Brightness { written, read_back } => {
                write!(f, "Brightness set to {} (read back: {})", written, read_back)
            }
            ActionReport::Temperature {
                requested,
                written,
                read_back,
            } => {
                write!(f, "Temperature set to {} mired", written)?;
                if i32::from(*written) != *requested {
                    write!(f, " (requested {}, clamped)", requested)?;
                }
                write!(f, " (read back: {})", read_back)
            }
            ActionReport::ColorXy { written, read_back } => {
                write!(f, "Color set to {} (read back: {})", written, read_back)
            }
            ActionReport::Color {
                rgb,
                gamut,
                gamut_fallback,
                written,
                read_back,
            } => {
                write!(
                    f,
                    "Color rgb({}, {}, {}) set to {} in {}",
                    rgb[0], rgb[1], rgb[2], written, gamut
                )?;
                if *gamut_fallback {
                    write!(f, " (default)")?;
                }
                write!(f, " (read back: {})", read_back)
            }
            ActionReport::Introspect { services } => {
                for (i, service) in services.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "Service {}", service.uuid)?;
                    for c in &service.characteristics {
                        write!(f, "\n  {}", c.uuid)?;
                        if c.role != Role::Unknown {
                            write!(f, " ({})", c.role)?;
                        }
                        write!(f, ": {}", c.value)?;
                    }
                }
                Ok(())
            }
            ActionReport::State {
                manufacturer,
                model,
                firmware,
                state,
            } => {
                writeln!(f, "Manufacturer: {}", manufacturer)?;
                writeln!(f, "Model: {}", model)?;
                writeln!(f, "Firmware: {}", firmware)?;
                write!(f, "State: {}", state)
            }
        }
    }
}

/// Runs actions against a connected transport.
pub struct Dispatcher<'a, T: BulbTransport + ?Sized> {
    transport: &'a T,
    registry: &'a Registry,
    gamut: &'a GamutContext,
    services: &'a [ServiceDescriptor],
}

impl<'a, T: BulbTransport + ?Sized> Dispatcher<'a, T> {
    pub fn new(
        transport: &'a T,
        registry: &'a Registry,
        gamut: &'a GamutContext,
        services: &'a [ServiceDescriptor],
    ) -> Self {
        Self {
            transport,
            registry,
            gamut,
            services,
        }
    }

    /// Execute `action`.
    ///
    /// Characteristics are resolved before any read or write, so an action
    /// needing an unbound role fails with [`Error::RoleNotBound`] without
    /// touching the device.
    #[tracing::instrument(level = "debug", skip(self), fields(address = %self.transport.address()))]
    pub async fn execute(&self, action: &Action) -> Result<ActionReport> {
        match *action {
            Action::Toggle => self.switch(None).await,
            Action::SwitchOn => self.switch(Some(true)).await,
            Action::SwitchOff => self.switch(Some(false)).await,
            Action::Brightness(level) => self.set_brightness(level).await,
            Action::Temperature(mired) => self.set_temperature(mired).await,
            Action::ColorXy { x, y } => {
                let handle = self.registry.resolve(Role::Color)?;
                let (written, read_back) = self.write_xy(handle, XyPoint::new(x, y)).await?;
                Ok(ActionReport::ColorXy { written, read_back })
            }
            Action::Color { red, green, blue } => self.set_rgb(red, green, blue).await,
            Action::Introspect => self.introspect().await,
            Action::State => self.state().await,
        }
    }

    /// Read the switch, then write `target` or the complement of the current value.
    async fn switch(&self, target: Option<bool>) -> Result<ActionReport> {
        let handle = self.registry.resolve(Role::LightSwitch)?;
        let was_on = match self.transport.read(handle).await? {
            Some(value) if !value.is_empty() => decode_switch(&value)?,
            _ => {
                return Err(Error::DeviceUnreachable {
                    role: Role::LightSwitch,
                });
            }
        };

        let is_on = target.unwrap_or(!was_on);
        debug!("Switch is {}, writing {}", on_off(was_on), on_off(is_on));
        self.transport
            .write(handle, &codec::encode_switch(is_on))
            .await?;
        info!("Light switched {}", on_off(is_on));

        Ok(ActionReport::Switch { was_on, is_on })
    }

    async fn set_brightness(&self, level: u8) -> Result<ActionReport> {
        let handle = self.registry.resolve(Role::Brightness)?;
        self.transport
            .write(handle, &codec::encode_brightness(level))
            .await?;
        let read_back = self.read_back(handle, decode_brightness).await;
        Ok(ActionReport::Brightness {
            written: level,
            read_back,
        })
    }

    async fn set_temperature(&self, mired: i32) -> Result<ActionReport> {
        let handle = self.registry.resolve(Role::Temperature)?;
        let written = codec::clamp_mired(mired);
        if i32::from(written) != mired {
            debug!("Temperature {} clamped to {}", mired, written);
        }
        self.transport
            .write(handle, &codec::encode_temperature(mired))
            .await?;
        let read_back = self.read_back(handle, decode_temperature).await;
        Ok(ActionReport::Temperature {
            requested: mired,
            written,
            read_back,
        })
    }

    async fn set_rgb(&self, red: f64, green: f64, blue: f64) -> Result<ActionReport> {
        let handle = self.registry.resolve(Role::Color)?;
        let gamut = self.gamut.gamut;
        let point = rgb_to_xy(red, green, blue, gamut);
        debug!("rgb({}, {}, {}) -> {} in {}", red, green, blue, point, gamut);

        let (written, read_back) = self.write_xy(handle, point).await?;
        Ok(ActionReport::Color {
            rgb: [red, green, blue],
            gamut,
            gamut_fallback: self.gamut.fallback,
            written,
            read_back,
        })
    }

    async fn write_xy(
        &self,
        handle: &CharacteristicHandle,
        point: XyPoint,
    ) -> Result<(XyPoint, Reading<XyPoint>)> {
        self.transport
            .write(handle, &codec::encode_color_xy(point.x, point.y))
            .await?;
        let read_back = self
            .read_back(handle, |payload| {
                decode_color_xy(payload).map(|(x, y)| XyPoint::new(x, y))
            })
            .await;
        Ok((point, read_back))
    }

    async fn introspect(&self) -> Result<ActionReport> {
        let mut services = Vec::with_capacity(self.services.len());
        for service in self.services {
            let mut characteristics = Vec::with_capacity(service.characteristics.len());
            for handle in &service.characteristics {
                // Read regardless of flags, a refused read reports as unreadable
                let value = self
                    .read_back(handle, |payload| Ok(decode_text(payload)))
                    .await;
                characteristics.push(CharacteristicReport {
                    uuid: handle.uuid,
                    role: Role::from_uuid(&handle.uuid),
                    flags: handle.flags,
                    value,
                });
            }
            services.push(ServiceReport {
                uuid: service.uuid,
                characteristics,
            });
        }
        Ok(ActionReport::Introspect { services })
    }

    async fn state(&self) -> Result<ActionReport> {
        let state_handle = self.registry.resolve(Role::CompositeState)?;

        let manufacturer = self.read_text(Role::Manufacturer).await;
        // Already read when the session became ready
        let model = self
            .gamut
            .model
            .clone()
            .map_or(Reading::Unreadable, Reading::Value);
        let firmware = self.read_text(Role::Firmware).await;
        let state = self.read_back(state_handle, decode_composite_state).await;

        Ok(ActionReport::State {
            manufacturer,
            model,
            firmware,
            state,
        })
    }

    async fn read_text(&self, role: Role) -> Reading<DecodedText> {
        match self.registry.resolve(role) {
            Ok(handle) => {
                self.read_back(handle, |payload| Ok(decode_text(payload)))
                    .await
            }
            Err(_) => {
                debug!("No {} characteristic to read", role);
                Reading::Unreadable
            }
        }
    }

    async fn read_back<V, F>(&self, handle: &CharacteristicHandle, decode: F) -> Reading<V>
    where
        F: FnOnce(&[u8]) -> ParseResult<V>,
    {
        match self.transport.read(handle).await {
            Ok(Some(payload)) => match decode(&payload) {
                Ok(value) => Reading::Value(value),
                Err(e) => {
                    warn!("Could not decode {}: {}", handle.uuid, e);
                    Reading::Raw(payload)
                }
            },
            Ok(None) => Reading::Unreadable,
            Err(e) => {
                warn!("Failed to read {}: {}", handle.uuid, e);
                Reading::Unreadable
            }
        }
    }
}
