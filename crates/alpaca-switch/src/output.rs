use serde::Serialize;

use crate::kind::{MAX_DIGITAL_VALUE, SwitchKind};
use crate::pin::Pin;

/// The hardware outputs driven by the switches.
///
/// A relay is addressed by its switch index, an analog output by its pin.
/// Both are passed to every call so an implementation can pick whichever it
/// needs.
pub trait SwitchOutput {
    /// Error returned by the hardware.
    type Error: core::fmt::Debug;

    /// Energizes or releases the relay coil of the switch at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error when the hardware cannot be written.
    fn write_digital(&mut self, index: usize, pin: Pin, energized: bool)
    -> Result<(), Self::Error>;

    /// Sets the level of the analog output of the switch at `index`.
    ///
    /// The level is expressed in the [`AnalogUnit`] configured on the
    /// [`SwitchRegistry`](crate::registry::SwitchRegistry).
    ///
    /// # Errors
    ///
    /// Returns an error when the hardware cannot be written.
    fn write_analog(&mut self, index: usize, pin: Pin, level: f32) -> Result<(), Self::Error>;

    /// Prepares the hardware of the switch at `index` for a new kind,
    /// for example enabling the `PWM` mode on the assigned pin.
    ///
    /// # Errors
    ///
    /// Returns an error when the hardware cannot be configured.
    fn configure(&mut self, index: usize, kind: SwitchKind, pin: Pin) -> Result<(), Self::Error>;
}

impl<T: SwitchOutput> SwitchOutput for &mut T {
    type Error = T::Error;

    fn write_digital(
        &mut self,
        index: usize,
        pin: Pin,
        energized: bool,
    ) -> Result<(), Self::Error> {
        (**self).write_digital(index, pin, energized)
    }

    fn write_analog(&mut self, index: usize, pin: Pin, level: f32) -> Result<(), Self::Error> {
        (**self).write_analog(index, pin, level)
    }

    fn configure(&mut self, index: usize, kind: SwitchKind, pin: Pin) -> Result<(), Self::Error> {
        (**self).configure(index, kind, pin)
    }
}

/// The unit of the level passed to [`SwitchOutput::write_analog`].
///
/// Analog switch values are always stored as counts in
/// `[0, MAX_DIGITAL_VALUE]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum AnalogUnit {
    /// The raw count, unchanged.
    #[default]
    Counts,
    /// The fraction of the full scale, in `[0, 1]`.
    DutyFraction,
}

impl AnalogUnit {
    /// Converts a switch value into the output level.
    #[must_use]
    pub fn level(self, value: f32) -> f32 {
        match self {
            Self::Counts => value,
            Self::DutyFraction => value / MAX_DIGITAL_VALUE,
        }
    }
}
