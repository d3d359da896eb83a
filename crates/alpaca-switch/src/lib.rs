//! The switch model of an ASCOM Alpaca switch device.
//!
//! This crate provides APIs to:
//!
//! - Describe a variable-length collection of heterogeneous switches
//!   (normally-open and normally-closed relays, `PWM` and `DAC` outputs),
//!   each with its own range, pin, writeable flag and current value.
//! - Resize that collection while preserving the switches that survive the
//!   resize.
//! - Validate the updates submitted through the device setup interface
//!   before they are committed.
//! - Persist the device configuration and all switches to a byte-addressable
//!   non-volatile medium, detecting an uninitialized medium through a magic
//!   byte and bootstrapping defaults when needed.
//!
//! The HTTP layer, the hardware outputs and the physical storage are
//! consumed through the [`parameters::ParameterSource`],
//! [`output::SwitchOutput`] and [`store::Storage`] traits.
//!
//! Every operation is synchronous and assumes that a single request is
//! processed at a time. Multi-threaded hosts must serialize the access to
//! [`state::DeviceState`] themselves.
//!
//! This crate can be compiled for both `std` and `no_std` environments.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

extern crate alloc;

/// Device-wide configuration.
pub mod config;
/// Switch descriptors.
pub mod descriptor;
/// Error management.
pub mod error;
/// Switch kinds.
pub mod kind;
/// Hardware output interface.
pub mod output;
/// Request parameters.
pub mod parameters;
/// Pin identifiers and pin maps.
pub mod pin;
/// The switch registry.
pub mod registry;
/// Error and status payloads sent back to clients.
pub mod response;
/// Setup submissions and their validation.
pub mod setup;
/// The device state shared by all request handlers.
pub mod state;
/// Persistent configuration storage.
pub mod store;

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[cfg(feature = "deserialize")]
pub(crate) fn serialize<T: serde::Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap()
}

#[cfg(test)]
#[cfg(feature = "deserialize")]
pub(crate) fn deserialize<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}
