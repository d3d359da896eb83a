//! # Relay and PWM Board
//!
//! A [`SwitchOutput`] combining a [`Pcf8574`] relay expander, addressed by
//! switch index, with a [`PwmBank`], addressed by pin.
//!
//! `PWM` and `DAC` switches are both driven through the PWM bank. An analog
//! switch without a pin is not connected, writes to it are discarded.

use core::result::Result::{self, Ok};

use embedded_hal::i2c::I2c;
use embedded_hal::pwm::SetDutyCycle;

use alpaca_switch::kind::SwitchKind;
use alpaca_switch::output::SwitchOutput;
use alpaca_switch::pin::Pin;

use crate::pcf8574::{Pcf8574, Pcf8574Error};
use crate::pwm::{PwmBank, PwmError};

/// Errors that may occur while driving the board.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoardError<I, P> {
    /// Relay expander error.
    Relay(Pcf8574Error<I>),
    /// PWM output error.
    Pwm(PwmError<P>),
}

impl<I, P> From<Pcf8574Error<I>> for BoardError<I, P> {
    fn from(e: Pcf8574Error<I>) -> Self {
        BoardError::Relay(e)
    }
}

impl<I, P> From<PwmError<P>> for BoardError<I, P> {
    fn from(e: PwmError<P>) -> Self {
        BoardError::Pwm(e)
    }
}

/// A board with relays on a PCF8574 and `N` PWM outputs.
pub struct Board<I2C, P, const N: usize> {
    relays: Pcf8574<I2C>,
    pwm: PwmBank<P, N>,
}

impl<I2C, IE, P, PE, const N: usize> Board<I2C, P, N>
where
    I2C: I2c<u8, Error = IE>,
    P: SetDutyCycle<Error = PE>,
{
    /// Creates a new [`Board`].
    #[must_use]
    pub fn new(relays: Pcf8574<I2C>, pwm: PwmBank<P, N>) -> Self {
        Self { relays, pwm }
    }

    /// Releases all relays and turns every PWM output off.
    ///
    /// # Errors
    ///
    /// Returns an error if the relays or the PWM outputs cannot be written.
    pub fn init(&mut self) -> Result<(), BoardError<IE, PE>> {
        self.relays.init()?;
        self.pwm.disable_all()?;

        Ok(())
    }

    /// Returns the relay expander.
    #[must_use]
    pub fn relays(&self) -> &Pcf8574<I2C> {
        &self.relays
    }

    /// Consumes the board, returning the relay expander and the PWM bank.
    #[must_use]
    pub fn release(self) -> (Pcf8574<I2C>, PwmBank<P, N>) {
        (self.relays, self.pwm)
    }
}

impl<I2C, IE, P, PE, const N: usize> SwitchOutput for Board<I2C, P, N>
where
    I2C: I2c<u8, Error = IE>,
    P: SetDutyCycle<Error = PE>,
    IE: core::fmt::Debug,
    PE: core::fmt::Debug,
{
    type Error = BoardError<IE, PE>;

    fn write_digital(
        &mut self,
        index: usize,
        _pin: Pin,
        energized: bool,
    ) -> Result<(), Self::Error> {
        self.relays.set(index, energized)?;

        Ok(())
    }

    fn write_analog(&mut self, _index: usize, pin: Pin, level: f32) -> Result<(), Self::Error> {
        if pin.is_null() {
            return Ok(());
        }
        self.pwm.set_level(pin, level)?;

        Ok(())
    }

    fn configure(&mut self, index: usize, kind: SwitchKind, pin: Pin) -> Result<(), Self::Error> {
        if kind.is_binary() {
            // A switch turned into a relay releases the coil before its
            // first write.
            self.relays.set(index, false)?;
        } else if kind.is_analog() && !pin.is_null() {
            self.pwm.set_level(pin, 0.0)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern crate std;
    use std::vec;

    use core::convert::Infallible;

    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    use alpaca_switch::output::AnalogUnit;
    use alpaca_switch::pin::PinMap;
    use alpaca_switch::registry::SwitchRegistry;
    use alpaca_switch::setup::KindSettings;

    use crate::pcf8574::Polarity;

    struct FakeOutput {
        duty: u16,
    }

    impl embedded_hal::pwm::ErrorType for FakeOutput {
        type Error = Infallible;
    }

    impl SetDutyCycle for FakeOutput {
        fn max_duty_cycle(&self) -> u16 {
            1000
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.duty = duty;
            Ok(())
        }
    }

    fn board(expectations: &[I2cTransaction]) -> Board<I2cMock, FakeOutput, 1> {
        let relays = Pcf8574::new(I2cMock::new(expectations), 0x20, Polarity::ActiveLow);
        let pwm = PwmBank::new([(Pin::new(14), FakeOutput { duty: 7 })]);
        Board::new(relays, pwm)
    }

    #[test]
    fn test_registry_drives_board() {
        let expectations = [
            I2cTransaction::write(0x20, vec![0b1111_1110]), // Relay 0 on.
            I2cTransaction::write(0x20, vec![0b1111_1111]), // Relay 0 off.
        ];
        let mut board = board(&expectations);
        let mut registry = SwitchRegistry::with_count(2)
            .unwrap()
            .with_pin_map(PinMap::from_ids(&[14]));

        registry.set_value(0, true, &mut board).unwrap();
        registry.set_value(0, true, &mut board).unwrap();
        registry.set_value(0, false, &mut board).unwrap();

        let (relays, _) = board.release();
        relays.release().done();
    }

    #[test]
    fn test_analog_switch() {
        let mut board = board(&[]);
        let mut registry = SwitchRegistry::with_count(2)
            .unwrap()
            .with_pin_map(PinMap::from_ids(&[14]))
            .analog_unit(AnalogUnit::Counts);

        registry
            .set_kind(
                1,
                KindSettings::analog(SwitchKind::Pwm, Pin::new(14), 0.0, 1024.0, 1.0),
                &mut board,
            )
            .unwrap();
        registry.set_analog_value(1, 512.0, &mut board).unwrap();

        let (relays, pwm) = board.release();
        let [(_, output)] = pwm.release();
        assert_eq!(output.duty, 500);
        relays.release().done();
    }

    #[test]
    fn test_unconnected_analog_switch() {
        let mut board = board(&[]);

        board.write_analog(3, Pin::new(0), 100.0).unwrap();
        board
            .configure(3, SwitchKind::Dac, Pin::new(0))
            .unwrap();

        let (relays, pwm) = board.release();
        let [(_, output)] = pwm.release();
        assert_eq!(output.duty, 7);
        relays.release().done();
    }

    #[test]
    fn test_relay_index_out_of_expander() {
        let mut board = board(&[]);

        assert_eq!(
            board.write_digital(8, Pin::new(0), true),
            Err(BoardError::Relay(Pcf8574Error::InvalidChannel(8)))
        );
        assert_eq!(
            board.write_analog(0, Pin::new(2), 1.0),
            Err(BoardError::Pwm(PwmError::UnknownPin(Pin::new(2))))
        );

        let (relays, _) = board.release();
        relays.release().done();
    }
}
