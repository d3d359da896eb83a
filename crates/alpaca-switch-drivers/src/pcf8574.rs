//! # PCF8574 Relay Driver
//!
//! This module provides an architecture-agnostic driver for relay boards
//! built around the PCF8574 and PCF8574A 8-bit I²C port expanders.
//!
//! The expander has no registers: every write sets the level of all eight
//! ports at once. The driver keeps a copy of the last written byte, so a
//! single relay can be changed without reading the ports back.
//!
//! Most relay boards drive the coil through a transistor which conducts
//! when the port is low. Use [`Polarity::ActiveLow`] for them.
//!
//! For detailed information and specifications, see the [datasheet](https://www.ti.com/lit/ds/symlink/pcf8574.pdf).

use core::result::Result::{self, Ok};

use embedded_hal::i2c::I2c;

use log::debug;

/// Number of ports of the expander.
pub const CHANNELS: u8 = 8;

/// Errors that may occur while driving the relays.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Pcf8574Error<E> {
    /// I²C bus error.
    I2c(E),
    /// The channel is not below [`CHANNELS`].
    InvalidChannel(usize),
}

impl<E> From<E> for Pcf8574Error<E> {
    fn from(e: E) -> Self {
        Pcf8574Error::I2c(e)
    }
}

/// The expander variant, which determines the base I²C address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// PCF8574, addresses `0x20` to `0x27`.
    Pcf8574,
    /// PCF8574A, addresses `0x38` to `0x3F`.
    Pcf8574A,
}

impl Variant {
    /// Returns the I²C address selected by the `A2`, `A1`, `A0` pins.
    ///
    /// Only the three lowest bits of `pins` are used.
    #[must_use]
    pub const fn address(self, pins: u8) -> u8 {
        let base = match self {
            Self::Pcf8574 => 0x20,
            Self::Pcf8574A => 0x38,
        };
        base | (pins & 0x07)
    }
}

/// The port level which energizes a relay coil.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Polarity {
    /// A high port energizes the coil.
    ActiveHigh,
    /// A low port energizes the coil.
    #[default]
    ActiveLow,
}

impl Polarity {
    #[inline]
    const fn released(self) -> u8 {
        match self {
            Self::ActiveHigh => 0x00,
            Self::ActiveLow => 0xFF,
        }
    }
}

/// PCF8574 relay driver.
pub struct Pcf8574<I2C> {
    i2c: I2C,
    address: u8,
    polarity: Polarity,
    ports: u8,
}

impl<I2C, E> Pcf8574<I2C>
where
    I2C: I2c<u8, Error = E>,
{
    /// Creates a new [`Pcf8574`] driver with the given I²C bus, address, and
    /// relay polarity.
    ///
    /// All relays are considered released until [`Self::init`] is called.
    #[must_use]
    pub fn new(i2c: I2C, address: u8, polarity: Polarity) -> Self {
        Self {
            i2c,
            address,
            polarity,
            ports: polarity.released(),
        }
    }

    /// Releases all relays.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I²C bus operation fails.
    pub fn init(&mut self) -> Result<(), Pcf8574Error<E>> {
        self.write_ports(self.polarity.released())
    }

    /// Energizes or releases the relay connected to `channel`.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [`Pcf8574Error::InvalidChannel`] if `channel` is not below
    ///   [`CHANNELS`].
    /// - An I²C error if communication with the device fails.
    pub fn set(&mut self, channel: usize, energized: bool) -> Result<(), Pcf8574Error<E>> {
        let mask = Self::mask(channel)?;
        let high = energized == (self.polarity == Polarity::ActiveHigh);
        let ports = if high {
            self.ports | mask
        } else {
            self.ports & !mask
        };
        self.write_ports(ports)?;
        debug!(
            "Relay {channel} {}",
            if energized { "energized" } else { "released" }
        );
        Ok(())
    }

    /// Whether the relay connected to `channel` is energized.
    ///
    /// The return value is [`None`] when the channel does not exist.
    #[must_use]
    pub fn is_energized(&self, channel: usize) -> Option<bool> {
        let mask = Self::mask(channel).ok()?;
        let high = self.ports & mask != 0;
        Some(high == (self.polarity == Polarity::ActiveHigh))
    }

    /// Returns the last byte written to the ports.
    #[must_use]
    pub const fn ports(&self) -> u8 {
        self.ports
    }

    /// Consumes the driver, returning the I²C bus.
    #[must_use]
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn mask(channel: usize) -> Result<u8, Pcf8574Error<E>> {
        if channel < usize::from(CHANNELS) {
            Ok(1 << channel)
        } else {
            Err(Pcf8574Error::InvalidChannel(channel))
        }
    }

    #[inline]
    fn write_ports(&mut self, ports: u8) -> Result<(), Pcf8574Error<E>> {
        self.i2c.write(self.address, &[ports])?;
        self.ports = ports;

        Ok(())
    }
}
