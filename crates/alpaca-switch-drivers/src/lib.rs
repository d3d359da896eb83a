//! `alpaca-switch-drivers` is a library crate that provides
//! architecture-agnostic output drivers for ASCOM Alpaca switch devices.
//!
//! All drivers are implemented using only the [`embedded-hal`] traits,
//! ensuring compatibility with any platform that supports these
//! abstractions. The [`board::Board`] driver implements the
//! [`SwitchOutput`](alpaca_switch::output::SwitchOutput) trait, so it can be
//! passed directly to a switch registry.
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

/// A relay board combining the `PCF8574` relays and the PWM outputs.
#[cfg(all(feature = "pcf8574", feature = "pwm"))]
pub mod board;

/// The `PCF8574` relay driver.
#[cfg(feature = "pcf8574")]
pub mod pcf8574;

/// The PWM output bank.
#[cfg(feature = "pwm")]
pub mod pwm;
