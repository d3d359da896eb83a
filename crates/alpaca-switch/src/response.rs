use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::Serialize;

use crate::config::DeviceConfig;
use crate::descriptor::SwitchDescriptor;
use crate::error::Error;
use crate::registry::SwitchRegistry;
use crate::setup::SetupField;

/// The ASCOM error classes reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorClass {
    /// The request carries an invalid value.
    InvalidValue,
    /// The request is not valid in the current device state.
    InvalidOperation,
    /// The hardware or the storage failed.
    DriverError,
}

impl ErrorClass {
    /// Returns the ASCOM error number associated with the [`ErrorClass`].
    #[must_use]
    pub const fn number(self) -> i32 {
        match self {
            Self::InvalidValue => 0x401,
            Self::InvalidOperation => 0x40B,
            Self::DriverError => 0x500,
        }
    }

    /// Returns the [`ErrorClass`] of an [`Error`].
    #[must_use]
    pub const fn of(error: &Error) -> Self {
        match error {
            Error::NotWriteable { .. } | Error::WrongKind { .. } => Self::InvalidOperation,
            Error::OutputFailure { .. }
            | Error::StorageCorrupt(_)
            | Error::StorageIo(_)
            | Error::StorageFull { .. } => Self::DriverError,
            _ => Self::InvalidValue,
        }
    }
}

/// An error reported to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    /// ASCOM error number.
    pub error_number: i32,
    /// Human readable message.
    pub error_message: String,
    /// Index of the switch the error refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Setup field the error refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<SetupField>,
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        Self {
            error_number: ErrorClass::of(error).number(),
            error_message: error.to_string(),
            index: error.index(),
            field: error.field(),
        }
    }
}

impl From<Error> for ErrorResponse {
    fn from(error: Error) -> Self {
        Self::from(&error)
    }
}

/// The status of a single switch.
///
/// Relays report their `state`, analog outputs their `value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchStatus {
    /// Switch index.
    pub id: usize,
    /// Switch name.
    pub name: String,
    /// Switch kind identifier.
    #[serde(rename = "type")]
    pub kind: i32,
    /// Switch kind name.
    #[serde(rename = "typeName")]
    pub kind_name: &'static str,
    /// Switch description.
    pub description: String,
    /// Minimum value.
    pub min: f32,
    /// Maximum value.
    pub max: f32,
    /// Step between two values.
    pub step: f32,
    /// Relay state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<bool>,
    /// Analog value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f32>,
    /// Writeable flag.
    pub writeable: bool,
}

impl SwitchStatus {
    /// Creates the [`SwitchStatus`] of the switch at `id`.
    #[must_use]
    pub fn new(id: usize, switch: &SwitchDescriptor) -> Self {
        let binary = switch.kind().is_binary();
        Self {
            id,
            name: String::from(switch.switch_name()),
            kind: switch.kind().id(),
            kind_name: switch.kind().name(),
            description: String::from(switch.description()),
            min: switch.min(),
            max: switch.max(),
            step: switch.step(),
            state: binary.then(|| switch.state()),
            value: (!binary).then(|| switch.value()),
            writeable: switch.writeable(),
        }
    }
}

/// A snapshot of the whole device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusResponse {
    /// Device hostname.
    pub host: String,
    /// Device location.
    pub location: String,
    /// All switches, in index order.
    pub switches: Vec<SwitchStatus>,
}

impl StatusResponse {
    /// Creates a [`StatusResponse`].
    #[must_use]
    pub fn new(config: &DeviceConfig, registry: &SwitchRegistry) -> Self {
        Self {
            host: String::from(config.get_hostname()),
            location: String::from(config.get_location()),
            switches: registry
                .iter()
                .enumerate()
                .map(|(id, switch)| SwitchStatus::new(id, switch))
                .collect(),
        }
    }
}
