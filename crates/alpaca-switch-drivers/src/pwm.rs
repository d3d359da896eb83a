//! # PWM Output Bank
//!
//! This module drives a fixed set of pulse-width modulated outputs, each
//! bound to the pin identifier used by the switch configuration.
//!
//! Levels are expressed as a fraction of a configurable full scale, which
//! must match the `AnalogUnit` of the switch registry.

use core::result::Result::{self, Ok};

use embedded_hal::pwm::SetDutyCycle;

use alpaca_switch::kind::MAX_DIGITAL_VALUE;
use alpaca_switch::pin::Pin;

use log::debug;

/// Errors that may occur while driving the outputs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PwmError<E> {
    /// PWM peripheral error.
    Pwm(E),
    /// No output is bound to the pin.
    UnknownPin(Pin),
}

impl<E> From<E> for PwmError<E> {
    fn from(e: E) -> Self {
        PwmError::Pwm(e)
    }
}

/// A bank of `N` PWM outputs.
pub struct PwmBank<P, const N: usize> {
    channels: [(Pin, P); N],
    full_scale: f32,
}

impl<P, E, const N: usize> PwmBank<P, N>
where
    P: SetDutyCycle<Error = E>,
{
    /// Creates a new [`PwmBank`] whose levels are switch counts in
    /// `[0, MAX_DIGITAL_VALUE]`.
    #[must_use]
    pub fn new(channels: [(Pin, P); N]) -> Self {
        Self {
            channels,
            full_scale: MAX_DIGITAL_VALUE,
        }
    }

    /// Sets the level which drives an output at 100% duty cycle.
    ///
    /// Use `1.0` when the switch registry writes duty fractions.
    #[must_use]
    pub fn full_scale(mut self, full_scale: f32) -> Self {
        self.full_scale = full_scale;
        self
    }

    /// Whether an output is bound to `pin`.
    #[must_use]
    pub fn contains(&self, pin: Pin) -> bool {
        self.channels.iter().any(|(bound, _)| *bound == pin)
    }

    /// Sets the level of the output bound to `pin`.
    ///
    /// The level is clamped to `[0, full_scale]`.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [`PwmError::UnknownPin`] if no output is bound to `pin`.
    /// - A PWM error if the duty cycle cannot be set.
    pub fn set_level(&mut self, pin: Pin, level: f32) -> Result<(), PwmError<E>> {
        let full_scale = self.full_scale;
        let (_, output) = self
            .channels
            .iter_mut()
            .find(|(bound, _)| *bound == pin)
            .ok_or(PwmError::UnknownPin(pin))?;

        let duty = duty_cycle(level, full_scale, output.max_duty_cycle());
        output.set_duty_cycle(duty)?;
        debug!("PWM pin {pin} set to {duty}");

        Ok(())
    }

    /// Turns every output off.
    ///
    /// # Errors
    ///
    /// Returns a PWM error if a duty cycle cannot be set.
    pub fn disable_all(&mut self) -> Result<(), PwmError<E>> {
        for (_, output) in &mut self.channels {
            output.set_duty_cycle_fully_off()?;
        }

        Ok(())
    }

    /// Consumes the bank, returning the outputs.
    #[must_use]
    pub fn release(self) -> [(Pin, P); N] {
        self.channels
    }
}

// Converts a level into a duty cycle, rounding to the nearest step.
#[inline]
fn duty_cycle(level: f32, full_scale: f32, max_duty: u16) -> u16 {
    if full_scale <= 0.0 {
        return 0;
    }
    let fraction = (level / full_scale).clamp(0.0, 1.0);
    // The cast saturates, the fraction never exceeds one.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let duty = (fraction * f32::from(max_duty) + 0.5) as u16;
    duty.min(max_duty)
}
