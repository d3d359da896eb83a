use alloc::format;
use alloc::string::String;

use serde::Serialize;

use log::debug;

use crate::error::{Error, Exceeded, Result};
use crate::kind::{MAX_BINARY_VALUE, MIN_VALUE, SwitchKind};
use crate::pin::{NULL_PIN, Pin, PinMap};
use crate::setup::{KindSettings, SetupField, SetupValidator};

/// Size in bytes of every persisted text field, terminator included.
///
/// Names, descriptions, hostnames and locations must be strictly shorter.
pub const MAX_NAME_LENGTH: usize = 25;

/// Description assigned to a newly created switch.
pub const DEFAULT_DESCRIPTION: &str = "Default description";

// Checks that a text fits in a persisted fixed-width field.
pub(crate) fn check_text(field: SetupField, text: &str) -> Result<()> {
    if text.len() >= MAX_NAME_LENGTH {
        return Err(Error::NameTooLong {
            field,
            length: text.len(),
            max: MAX_NAME_LENGTH,
        });
    }
    if text.contains('\0') {
        return Err(Error::InvalidCharacter { field });
    }
    Ok(())
}

/// The configuration and current state of a single switch.
///
/// Kind, pin, and range can only change through the
/// [`SwitchRegistry`](crate::registry::SwitchRegistry), which validates them
/// together. Name, description and writeable flag can be changed directly.
///
/// A deserialized descriptor is validated on its own: pin availability and
/// pin conflicts are checked by the registry holding it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
#[cfg_attr(feature = "deserialize", serde(try_from = "StoredDescriptor"))]
pub struct SwitchDescriptor {
    pub(crate) switch_name: String,
    pub(crate) description: String,
    pub(crate) kind: SwitchKind,
    pub(crate) pin: Pin,
    pub(crate) writeable: bool,
    pub(crate) min: f32,
    pub(crate) max: f32,
    pub(crate) step: f32,
    pub(crate) value: f32,
}

impl Default for SwitchDescriptor {
    fn default() -> Self {
        Self::default_for(0)
    }
}

impl SwitchDescriptor {
    /// Creates the default descriptor of the switch at `index`.
    ///
    /// The switch is a writeable, open, normally-open relay named
    /// `Switch_<index>`.
    #[must_use]
    pub fn default_for(index: usize) -> Self {
        Self {
            switch_name: format!("Switch_{index}"),
            description: String::from(DEFAULT_DESCRIPTION),
            kind: SwitchKind::RelayNo,
            pin: NULL_PIN,
            writeable: true,
            min: MIN_VALUE,
            max: MAX_BINARY_VALUE,
            step: 1.0,
            value: MIN_VALUE,
        }
    }

    /// Returns the switch name.
    #[must_use]
    pub fn switch_name(&self) -> &str {
        &self.switch_name
    }

    /// Returns the switch description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the [`SwitchKind`].
    #[must_use]
    pub const fn kind(&self) -> SwitchKind {
        self.kind
    }

    /// Returns the assigned [`Pin`].
    #[must_use]
    pub const fn pin(&self) -> Pin {
        self.pin
    }

    /// Whether clients may change the switch value.
    #[must_use]
    pub const fn writeable(&self) -> bool {
        self.writeable
    }

    /// Returns the minimum value.
    #[must_use]
    pub const fn min(&self) -> f32 {
        self.min
    }

    /// Returns the maximum value.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Returns the step between two consecutive values.
    #[must_use]
    pub const fn step(&self) -> f32 {
        self.step
    }

    /// Returns the current value.
    ///
    /// Relays are `0.0` when open and `1.0` when closed.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.value
    }

    /// Returns the current state of a relay.
    ///
    /// Only a value of exactly [`MAX_BINARY_VALUE`] counts as closed.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn state(&self) -> bool {
        self.value == MAX_BINARY_VALUE
    }

    /// Changes the switch name.
    ///
    /// # Errors
    ///
    /// Fails when the name does not fit in [`MAX_NAME_LENGTH`] bytes, or
    /// contains a `NUL` character.
    pub fn set_name(&mut self, text: &str) -> Result<()> {
        check_text(SetupField::Name, text)?;
        debug!("Switch name changed from `{}` to `{text}`", self.switch_name);
        self.switch_name = String::from(text);
        Ok(())
    }

    /// Changes the switch description.
    ///
    /// # Errors
    ///
    /// Fails when the description does not fit in [`MAX_NAME_LENGTH`] bytes,
    /// or contains a `NUL` character.
    pub fn set_description(&mut self, text: &str) -> Result<()> {
        check_text(SetupField::Description, text)?;
        self.description = String::from(text);
        Ok(())
    }

    /// Allows or denies clients to change the switch value.
    pub fn set_writeable(&mut self, writeable: bool) {
        self.writeable = writeable;
    }

    /// Returns the kind-dependent settings of the switch.
    #[must_use]
    pub const fn settings(&self) -> KindSettings {
        KindSettings {
            kind: self.kind,
            pin: self.pin,
            min: self.min,
            max: self.max,
            step: self.step,
            writeable: self.writeable,
        }
    }

    // Checks every invariant of the switch at `index` of `switches`.
    #[allow(clippy::float_cmp)]
    pub(crate) fn check(
        &self,
        index: usize,
        switches: &[SwitchDescriptor],
        pins: &PinMap,
    ) -> Result<()> {
        check_text(SetupField::Name, &self.switch_name)?;
        check_text(SetupField::Description, &self.description)?;
        SetupValidator::new(switches, pins).check_settings(index, &self.settings())?;

        let in_range = (self.min..=self.max).contains(&self.value);
        let binary_level = !self.kind.is_binary()
            || self.value == MIN_VALUE
            || self.state();
        if in_range && binary_level {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                index,
                exceeded: Exceeded::ValueRange {
                    value: self.value,
                    min: self.min,
                    max: self.max,
                },
            })
        }
    }
}

// The serialized form of a descriptor, before validation.
#[cfg(feature = "deserialize")]
#[derive(serde::Deserialize)]
struct StoredDescriptor {
    switch_name: String,
    description: String,
    kind: SwitchKind,
    pin: Pin,
    writeable: bool,
    min: f32,
    max: f32,
    step: f32,
    value: f32,
}

#[cfg(feature = "deserialize")]
impl TryFrom<StoredDescriptor> for SwitchDescriptor {
    type Error = Error;

    fn try_from(stored: StoredDescriptor) -> Result<Self> {
        let descriptor = Self {
            switch_name: stored.switch_name,
            description: stored.description,
            kind: stored.kind,
            pin: stored.pin,
            writeable: stored.writeable,
            min: stored.min,
            max: stored.max,
            step: stored.step,
            value: stored.value,
        };
        let pins = PinMap::from_ids(&[descriptor.pin.id()]);
        descriptor.check(0, core::slice::from_ref(&descriptor), &pins)?;
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::kind::SwitchKind;
    use crate::setup::SetupField;

    use super::{DEFAULT_DESCRIPTION, SwitchDescriptor};

    #[test]
    fn test_default_descriptor() {
        let descriptor = SwitchDescriptor::default_for(3);

        assert_eq!(descriptor.switch_name(), "Switch_3");
        assert_eq!(descriptor.description(), DEFAULT_DESCRIPTION);
        assert_eq!(descriptor.kind(), SwitchKind::RelayNo);
        assert!(descriptor.pin().is_null());
        assert!(descriptor.writeable());
        assert!(descriptor.min().abs() < f32::EPSILON);
        assert!((descriptor.max() - 1.0).abs() < f32::EPSILON);
        assert!((descriptor.step() - 1.0).abs() < f32::EPSILON);
        assert!(!descriptor.state());

        assert_eq!(SwitchDescriptor::default(), SwitchDescriptor::default_for(0));
    }

    #[test]
    fn test_name_length() {
        let mut descriptor = SwitchDescriptor::default();

        // 24 bytes plus the terminator fill the persisted field.
        descriptor.set_name("abcdefghijklmnopqrstuvwx").unwrap();
        assert_eq!(descriptor.switch_name(), "abcdefghijklmnopqrstuvwx");

        assert_eq!(
            descriptor.set_name("abcdefghijklmnopqrstuvwxy"),
            Err(Error::NameTooLong {
                field: SetupField::Name,
                length: 25,
                max: 25,
            })
        );
        assert_eq!(descriptor.switch_name(), "abcdefghijklmnopqrstuvwx");
    }

    #[test]
    fn test_description_rejects_nul() {
        let mut descriptor = SwitchDescriptor::default();

        assert_eq!(
            descriptor.set_description("dome\0fan"),
            Err(Error::InvalidCharacter {
                field: SetupField::Description
            })
        );
        assert_eq!(descriptor.description(), DEFAULT_DESCRIPTION);
    }

    #[cfg(feature = "deserialize")]
    #[test]
    fn test_deserialize_checks_invariants() {
        use serde_json::json;

        let switch = SwitchDescriptor::default_for(1);
        let value = crate::serialize(&switch);
        assert_eq!(crate::deserialize::<SwitchDescriptor>(value.clone()), switch);

        for (field, invalid) in [
            ("switch_name", json!("abcdefghijklmnopqrstuvwxy")),
            ("description", json!("roof\0motor")),
            ("pin", json!(14)),
            ("min", json!(2.0)),
            ("max", json!(5.0)),
            ("value", json!(0.5)),
        ] {
            let mut value = value.clone();
            value[field] = invalid;
            assert!(serde_json::from_value::<SwitchDescriptor>(value).is_err());
        }
    }
}
