use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use serde::Serialize;

use log::{debug, info};

use crate::descriptor::SwitchDescriptor;
use crate::error::{Error, Exceeded, Result};
use crate::kind::{MAX_BINARY_VALUE, MIN_VALUE, SwitchKind};
use crate::output::{AnalogUnit, SwitchOutput};
use crate::pin::{Pin, PinMap};
use crate::setup::{KindSettings, SetupValidator, SwitchUpdate, ValidatedSetup};

/// Maximum number of switches a device can expose.
pub const MAX_SWITCH: usize = 8;

/// Number of switches of a device booted from an uninitialized storage.
pub const DEFAULT_NUM_SWITCHES: usize = 8;

const fn check_count(count: usize) -> Result<()> {
    if count == 0 || count > MAX_SWITCH {
        Err(Error::InvalidCount {
            count,
            max: MAX_SWITCH,
        })
    } else {
        Ok(())
    }
}

/// Checks that `switches` form a valid registry on a board exposing `pins`.
///
/// # Errors
///
/// Fails when the number of switches is outside `[1, MAX_SWITCH]`, or with
/// the first switch which breaks an invariant: a text too long, a setting
/// rejected by [`SetupValidator::check_settings`], or a value outside the
/// switch range.
pub fn check_switches(switches: &[SwitchDescriptor], pins: &PinMap) -> Result<()> {
    check_count(switches.len())?;
    switches
        .iter()
        .enumerate()
        .try_for_each(|(index, switch)| switch.check(index, switches, pins))
}

const fn energized(kind: SwitchKind, state: bool) -> bool {
    match kind {
        SwitchKind::RelayNc => !state,
        _ => state,
    }
}

fn output_failure<E: core::fmt::Debug>(index: usize) -> impl FnOnce(E) -> Error {
    move |error| Error::OutputFailure {
        index,
        reason: format!("{error:?}"),
    }
}

/// The ordered collection of switches exposed by a device.
///
/// A registry always holds between 1 and [`MAX_SWITCH`] switches. Switches
/// are addressed by their zero-based index, which is also the identifier
/// used by clients.
///
/// A deserialized registry is checked with [`check_switches`] against the
/// pins its analog switches use, since the board pin map is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
#[cfg_attr(feature = "deserialize", serde(try_from = "StoredRegistry"))]
pub struct SwitchRegistry {
    switches: Vec<SwitchDescriptor>,
    #[serde(skip)]
    pins: PinMap,
    #[serde(skip)]
    analog_unit: AnalogUnit,
}

#[cfg(feature = "deserialize")]
#[derive(serde::Deserialize)]
struct StoredRegistry {
    switches: Vec<SwitchDescriptor>,
}

#[cfg(feature = "deserialize")]
impl TryFrom<StoredRegistry> for SwitchRegistry {
    type Error = Error;

    fn try_from(stored: StoredRegistry) -> Result<Self> {
        let mut pins = PinMap::empty();
        for switch in stored.switches.iter().filter(|switch| switch.kind.is_analog()) {
            pins.add(switch.pin);
        }
        check_switches(&stored.switches, &pins)?;
        Self::from_switches(stored.switches)
    }
}

impl Default for SwitchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SwitchRegistry {
    /// Creates a [`SwitchRegistry`] with [`DEFAULT_NUM_SWITCHES`] default
    /// switches and an empty [`PinMap`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            switches: (0..DEFAULT_NUM_SWITCHES)
                .map(SwitchDescriptor::default_for)
                .collect(),
            pins: PinMap::empty(),
            analog_unit: AnalogUnit::default(),
        }
    }

    /// Creates a [`SwitchRegistry`] with `count` default switches.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidCount`] when `count` is outside
    /// `[1, MAX_SWITCH]`.
    pub fn with_count(count: usize) -> Result<Self> {
        check_count(count)?;
        Ok(Self {
            switches: (0..count).map(SwitchDescriptor::default_for).collect(),
            ..Self::new()
        })
    }

    /// Creates a [`SwitchRegistry`] from already validated switches.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidCount`] when the number of switches is
    /// outside `[1, MAX_SWITCH]`.
    pub fn from_switches(switches: Vec<SwitchDescriptor>) -> Result<Self> {
        check_count(switches.len())?;
        Ok(Self {
            switches,
            ..Self::new()
        })
    }

    /// Sets the pins available for analog switches.
    #[must_use]
    #[inline]
    pub fn with_pin_map(mut self, pins: PinMap) -> Self {
        self.pins = pins;
        self
    }

    /// Sets the unit of the levels written to analog outputs.
    #[must_use]
    #[inline]
    pub const fn analog_unit(mut self, analog_unit: AnalogUnit) -> Self {
        self.analog_unit = analog_unit;
        self
    }

    /// Returns the pins available for analog switches.
    #[must_use]
    pub const fn pins(&self) -> &PinMap {
        &self.pins
    }

    /// Returns the unit of the levels written to analog outputs.
    #[must_use]
    pub const fn unit(&self) -> AnalogUnit {
        self.analog_unit
    }

    /// Returns the number of switches.
    #[must_use]
    pub fn count(&self) -> usize {
        self.switches.len()
    }

    /// Returns an iterator over the switches, in index order.
    pub fn iter(&self) -> core::slice::Iter<'_, SwitchDescriptor> {
        self.switches.iter()
    }

    /// Returns all switches as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[SwitchDescriptor] {
        &self.switches
    }

    /// Returns the switch at `index`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::OutOfRange`] when `index` is not below
    /// [`Self::count`].
    pub fn get(&self, index: usize) -> Result<&SwitchDescriptor> {
        self.switches
            .get(index)
            .ok_or(Error::index_out_of_range(index, self.switches.len()))
    }

    /// Returns the switch at `index` for modification.
    ///
    /// Only the fields which do not depend on the other switches can be
    /// changed through the returned reference.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::OutOfRange`] when `index` is not below
    /// [`Self::count`].
    pub fn get_mut(&mut self, index: usize) -> Result<&mut SwitchDescriptor> {
        let count = self.switches.len();
        self.switches
            .get_mut(index)
            .ok_or(Error::index_out_of_range(index, count))
    }

    /// Returns a [`SetupValidator`] bound to the current switches.
    #[must_use]
    pub fn validator(&self) -> SetupValidator<'_> {
        SetupValidator::new(&self.switches, &self.pins)
    }

    /// Changes the number of switches.
    ///
    /// Shrinking permanently discards the switches at the removed indices.
    /// Growing appends default switches. The switches below
    /// `min(old, new)` are never touched.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidCount`] when `count` is outside
    /// `[1, MAX_SWITCH]`, leaving the registry unchanged.
    pub fn resize(&mut self, count: usize) -> Result<()> {
        check_count(count)?;
        let old = self.switches.len();
        if count < old {
            self.switches.truncate(count);
        } else {
            self.switches.extend((old..count).map(SwitchDescriptor::default_for));
        }
        if count != old {
            info!("Switches resized from {old} to {count}");
        }
        Ok(())
    }

    /// Opens or closes the relay at `index`.
    ///
    /// The hardware is written only when the state changes. A
    /// normally-closed relay is energized when opened.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] when `index` is not below [`Self::count`]
    /// - [`Error::NotWriteable`] when the switch is read-only
    /// - [`Error::WrongKind`] when the switch is not a relay
    /// - [`Error::OutputFailure`] when the hardware write fails, leaving
    ///   the state unchanged
    pub fn set_value<O: SwitchOutput>(
        &mut self,
        index: usize,
        state: bool,
        output: &mut O,
    ) -> Result<()> {
        let switch = self.writeable_switch(index)?;
        if !switch.kind.is_binary() {
            return Err(Error::WrongKind {
                index,
                kind: switch.kind,
            });
        }

        if switch.state() == state {
            debug!("Switch {index} already {}", if state { "on" } else { "off" });
            return Ok(());
        }

        output
            .write_digital(index, switch.pin, energized(switch.kind, state))
            .map_err(output_failure(index))?;

        switch.value = if state { MAX_BINARY_VALUE } else { MIN_VALUE };
        debug!("Switch {index} set to {}", switch.value);
        Ok(())
    }

    /// Sets the value of the analog output at `index`.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] when `index` is not below [`Self::count`],
    ///   or `value` is outside the switch range
    /// - [`Error::NotWriteable`] when the switch is read-only
    /// - [`Error::WrongKind`] when the switch is a relay
    /// - [`Error::OutputFailure`] when the hardware write fails, leaving
    ///   the value unchanged
    pub fn set_analog_value<O: SwitchOutput>(
        &mut self,
        index: usize,
        value: f32,
        output: &mut O,
    ) -> Result<()> {
        let unit = self.analog_unit;
        let switch = self.writeable_switch(index)?;
        if !switch.kind.is_analog() {
            return Err(Error::WrongKind {
                index,
                kind: switch.kind,
            });
        }
        if !(switch.min..=switch.max).contains(&value) {
            return Err(Error::OutOfRange {
                index,
                exceeded: Exceeded::ValueRange {
                    value,
                    min: switch.min,
                    max: switch.max,
                },
            });
        }

        output
            .write_analog(index, switch.pin, unit.level(value))
            .map_err(output_failure(index))?;

        switch.value = value;
        debug!("Switch {index} set to {value}");
        Ok(())
    }

    /// Changes the kind-dependent settings of the switch at `index`.
    ///
    /// The settings are validated against the other switches. On success
    /// the value is reset and the hardware is configured for the new kind.
    ///
    /// # Errors
    ///
    /// Fails when the index is out of range, when the settings are
    /// rejected by [`SetupValidator::check_settings`], or when the hardware
    /// cannot be configured. The switch is left unchanged on failure.
    pub fn set_kind<O: SwitchOutput>(
        &mut self,
        index: usize,
        settings: KindSettings,
        output: &mut O,
    ) -> Result<()> {
        let _ = self.get(index)?;
        self.validator().check_settings(index, &settings)?;
        self.commit_settings(index, settings, output)
    }

    /// Applies a setup submission to the switch at `index`.
    ///
    /// # Errors
    ///
    /// Fails with the first error reported by the [`SetupValidator`], or
    /// when the hardware cannot be configured. The switch is left unchanged
    /// on failure.
    pub fn apply_setup<O: SwitchOutput>(
        &mut self,
        index: usize,
        update: &SwitchUpdate,
        output: &mut O,
    ) -> Result<()> {
        let setup = self.validator().validate(index, update)?;
        let settings = setup.settings;
        self.drive(index, settings.kind, settings.pin, settings.reset_value(), output)?;
        self.stage_setup(index, setup)
    }

    /// Applies an already validated setup to the switch at `index`,
    /// without touching the hardware.
    ///
    /// The value is reset as by [`Self::set_kind`]. Call
    /// [`Self::restore_output`] to drive the hardware afterwards.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::OutOfRange`] when `index` is not below
    /// [`Self::count`].
    pub fn stage_setup(&mut self, index: usize, setup: ValidatedSetup) -> Result<()> {
        self.store_settings(index, setup.settings)?;
        let switch = self.get_mut(index)?;
        switch.switch_name = setup.name;
        switch.description = setup.description;
        debug!("Switch {index} configured as `{}`", switch.switch_name);
        Ok(())
    }

    /// Configures the hardware of the switch at `index` for its kind and
    /// drives it to the current value.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::OutOfRange`] when `index` is not below
    /// [`Self::count`], or with [`Error::OutputFailure`] when the hardware
    /// cannot be written.
    pub fn restore_output<O: SwitchOutput>(&self, index: usize, output: &mut O) -> Result<()> {
        let switch = self.get(index)?;
        self.drive(index, switch.kind, switch.pin, switch.value, output)
    }

    /// Changes the name of the switch at `index`.
    ///
    /// # Errors
    ///
    /// Fails when the index is out of range or the name is rejected by
    /// [`SwitchDescriptor::set_name`].
    pub fn set_name(&mut self, index: usize, name: &str) -> Result<()> {
        self.get_mut(index)?.set_name(name)
    }

    /// Changes the description of the switch at `index`.
    ///
    /// # Errors
    ///
    /// Fails when the index is out of range or the description is rejected
    /// by [`SwitchDescriptor::set_description`].
    pub fn set_description(&mut self, index: usize, description: &str) -> Result<()> {
        self.get_mut(index)?.set_description(description)
    }

    /// Allows or denies clients to change the value of the switch at
    /// `index`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::OutOfRange`] when `index` is not below
    /// [`Self::count`].
    pub fn set_writeable(&mut self, index: usize, writeable: bool) -> Result<()> {
        self.get_mut(index)?.set_writeable(writeable);
        Ok(())
    }

    /// Returns the names of all switches, in index order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.switches
            .iter()
            .map(|switch| String::from(switch.switch_name()))
            .collect()
    }

    fn writeable_switch(&mut self, index: usize) -> Result<&mut SwitchDescriptor> {
        let switch = self.get_mut(index)?;
        if !switch.writeable {
            return Err(Error::NotWriteable { index });
        }
        Ok(switch)
    }

    // Settings must have already been validated.
    fn commit_settings<O: SwitchOutput>(
        &mut self,
        index: usize,
        settings: KindSettings,
        output: &mut O,
    ) -> Result<()> {
        self.drive(index, settings.kind, settings.pin, settings.reset_value(), output)?;
        self.store_settings(index, settings)
    }

    fn store_settings(&mut self, index: usize, settings: KindSettings) -> Result<()> {
        let switch = self.get_mut(index)?;
        switch.kind = settings.kind;
        switch.pin = settings.pin;
        switch.min = settings.min;
        switch.max = settings.max;
        switch.step = settings.step;
        switch.writeable = settings.writeable;
        switch.value = settings.reset_value();
        debug!("Switch {index} kind set to {}", settings.kind);
        Ok(())
    }

    fn drive<O: SwitchOutput>(
        &self,
        index: usize,
        kind: SwitchKind,
        pin: Pin,
        value: f32,
        output: &mut O,
    ) -> Result<()> {
        let written = if kind.is_binary() {
            let state = value >= MAX_BINARY_VALUE;
            output
                .configure(index, kind, pin)
                .and_then(|()| output.write_digital(index, pin, energized(kind, state)))
        } else if kind.is_analog() {
            output
                .configure(index, kind, pin)
                .and_then(|()| output.write_analog(index, pin, self.analog_unit.level(value)))
        } else {
            Ok(())
        };
        written.map_err(output_failure(index))
    }
}

impl<'a> IntoIterator for &'a SwitchRegistry {
    type Item = &'a SwitchDescriptor;
    type IntoIter = core::slice::Iter<'a, SwitchDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
