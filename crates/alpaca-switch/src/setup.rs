use alloc::string::String;

use serde::Serialize;

use log::warn;

use crate::descriptor::{SwitchDescriptor, check_text};
use crate::error::{Error, Result};
use crate::kind::{MAX_BINARY_VALUE, MIN_VALUE, SwitchKind};
use crate::parameters::{ParameterSource, parse_bool, parse_f32, parse_i32};
use crate::pin::{NULL_PIN, Pin, PinMap};

/// A field of a setup submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum SetupField {
    /// Switch index.
    Id,
    /// Switch name.
    Name,
    /// Switch description.
    Description,
    /// Switch kind.
    Kind,
    /// Writeable flag.
    Writeable,
    /// Analog output pin.
    Pin,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// Step between two values.
    Step,
    /// Number of switches.
    NumSwitches,
    /// Device hostname.
    Hostname,
    /// Device location.
    Location,
}

impl core::fmt::Display for SetupField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl SetupField {
    /// Returns the name of the request parameter carrying the field.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "Id",
            Self::Name => "switchName",
            Self::Description => "description",
            Self::Kind => "type",
            Self::Writeable => "writeable",
            Self::Pin => "pin",
            Self::Min => "min",
            Self::Max => "max",
            Self::Step => "step",
            Self::NumSwitches => "numSwitches",
            Self::Hostname => "hostname",
            Self::Location => "location",
        }
    }
}

const REQUIRED_FIELDS: [SetupField; 4] = [
    SetupField::Name,
    SetupField::Description,
    SetupField::Kind,
    SetupField::Writeable,
];

const RANGE_FIELDS: [SetupField; 4] = [
    SetupField::Pin,
    SetupField::Min,
    SetupField::Max,
    SetupField::Step,
];

/// The kind-dependent settings of a switch, validated together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct KindSettings {
    /// Switch kind.
    pub kind: SwitchKind,
    /// Analog output pin, [`NULL_PIN`] for relays.
    pub pin: Pin,
    /// Minimum value.
    pub min: f32,
    /// Maximum value.
    pub max: f32,
    /// Step between two values.
    pub step: f32,
    /// Writeable flag.
    pub writeable: bool,
}

impl KindSettings {
    /// Creates the settings of a relay with the `[0, 1]` range.
    #[must_use]
    pub const fn relay(kind: SwitchKind) -> Self {
        Self {
            kind,
            pin: NULL_PIN,
            min: MIN_VALUE,
            max: MAX_BINARY_VALUE,
            step: 1.0,
            writeable: true,
        }
    }

    /// Creates the settings of an analog output driven through `pin`.
    #[must_use]
    pub const fn analog(kind: SwitchKind, pin: Pin, min: f32, max: f32, step: f32) -> Self {
        Self {
            kind,
            pin,
            min,
            max,
            step,
            writeable: true,
        }
    }

    /// Sets the writeable flag.
    #[must_use]
    pub const fn writeable(mut self, writeable: bool) -> Self {
        self.writeable = writeable;
        self
    }

    /// Returns the value a switch takes right after being configured.
    ///
    /// Analog switches start at their minimum. Relays start open unless
    /// their minimum is the closed state.
    #[must_use]
    pub fn reset_value(&self) -> f32 {
        if self.kind.is_binary() && self.min < MAX_BINARY_VALUE {
            MIN_VALUE
        } else {
            self.min
        }
    }
}

/// The raw fields of a switch setup submission, as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct SwitchUpdate {
    name: Option<String>,
    description: Option<String>,
    kind: Option<String>,
    writeable: Option<String>,
    pin: Option<String>,
    min: Option<String>,
    max: Option<String>,
    step: Option<String>,
}

impl SwitchUpdate {
    /// Collects the setup fields from a [`ParameterSource`].
    ///
    /// Missing fields are detected later, by the [`SetupValidator`].
    #[must_use]
    pub fn collect<P: ParameterSource + ?Sized>(params: &P) -> Self {
        let take = |field: SetupField| params.get_param(field.name()).map(String::from);
        Self {
            name: take(SetupField::Name),
            description: take(SetupField::Description),
            kind: take(SetupField::Kind),
            writeable: take(SetupField::Writeable),
            pin: take(SetupField::Pin),
            min: take(SetupField::Min),
            max: take(SetupField::Max),
            step: take(SetupField::Step),
        }
    }

    /// Returns the raw value of a field.
    #[must_use]
    pub fn get(&self, field: SetupField) -> Option<&str> {
        match field {
            SetupField::Name => self.name.as_deref(),
            SetupField::Description => self.description.as_deref(),
            SetupField::Kind => self.kind.as_deref(),
            SetupField::Writeable => self.writeable.as_deref(),
            SetupField::Pin => self.pin.as_deref(),
            SetupField::Min => self.min.as_deref(),
            SetupField::Max => self.max.as_deref(),
            SetupField::Step => self.step.as_deref(),
            SetupField::Id
            | SetupField::NumSwitches
            | SetupField::Hostname
            | SetupField::Location => None,
        }
    }

    /// Sets the raw value of a field.
    ///
    /// Fields which do not belong to a switch submission are ignored.
    #[must_use]
    pub fn with(mut self, field: SetupField, value: &str) -> Self {
        let value = Some(String::from(value));
        match field {
            SetupField::Name => self.name = value,
            SetupField::Description => self.description = value,
            SetupField::Kind => self.kind = value,
            SetupField::Writeable => self.writeable = value,
            SetupField::Pin => self.pin = value,
            SetupField::Min => self.min = value,
            SetupField::Max => self.max = value,
            SetupField::Step => self.step = value,
            SetupField::Id
            | SetupField::NumSwitches
            | SetupField::Hostname
            | SetupField::Location => {}
        }
        self
    }

    // Returns whether the submission is complete, or in the short form
    // which omits all the range fields.
    fn is_short_form(&self) -> Result<bool> {
        if let Some(missing) = REQUIRED_FIELDS
            .into_iter()
            .find(|field| self.get(*field).is_none())
        {
            return Err(Error::IncompleteSubmission { missing });
        }

        let present = RANGE_FIELDS
            .into_iter()
            .filter(|field| self.get(*field).is_some())
            .count();
        if present == 0 {
            return Ok(true);
        }
        match RANGE_FIELDS
            .into_iter()
            .find(|field| self.get(*field).is_none())
        {
            Some(missing) => Err(Error::IncompleteSubmission { missing }),
            None => Ok(false),
        }
    }
}

/// A setup submission which passed every check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedSetup {
    /// Switch name.
    pub name: String,
    /// Switch description.
    pub description: String,
    /// Kind-dependent settings.
    pub settings: KindSettings,
}

/// Validates setup submissions against the other switches of the device.
///
/// Checks run in a fixed order and stop at the first failure:
///
/// 1. completeness
/// 2. kind
/// 3. pin, an unparsable pin fails here
/// 4. range, an unparsable writeable flag, minimum, maximum or step fails
///    here
/// 5. ordering
/// 6. name and description length
#[derive(Debug, Clone, Copy)]
pub struct SetupValidator<'a> {
    switches: &'a [SwitchDescriptor],
    pins: &'a PinMap,
}

impl<'a> SetupValidator<'a> {
    /// Creates a [`SetupValidator`].
    #[must_use]
    pub const fn new(switches: &'a [SwitchDescriptor], pins: &'a PinMap) -> Self {
        Self { switches, pins }
    }

    /// Validates a complete setup submission for the switch at `index`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failed check.
    pub fn validate(&self, index: usize, update: &SwitchUpdate) -> Result<ValidatedSetup> {
        self.run(index, update).inspect_err(|error| {
            warn!("Setup of switch {index} rejected: {error}");
        })
    }

    fn run(&self, index: usize, update: &SwitchUpdate) -> Result<ValidatedSetup> {
        let current = self
            .switches
            .get(index)
            .ok_or(Error::index_out_of_range(index, self.switches.len()))?;

        let short_form = update.is_short_form()?;

        let kind = parse_kind(update.get(SetupField::Kind).unwrap_or_default())?;
        if short_form && kind.is_analog() {
            return Err(Error::IncompleteSubmission {
                missing: SetupField::Pin,
            });
        }

        let pin = if short_form {
            NULL_PIN
        } else {
            update
                .get(SetupField::Pin)
                .and_then(parse_i32)
                .map(Pin::new)
                .ok_or(Error::ValueOutOfRange {
                    field: SetupField::Pin,
                    max: kind.max_value(),
                })?
        };
        self.check_pin(index, kind, pin)?;

        let writeable = update
            .get(SetupField::Writeable)
            .and_then(parse_bool)
            .ok_or(Error::ValueOutOfRange {
                field: SetupField::Writeable,
                max: MAX_BINARY_VALUE,
            })?;

        let settings = if short_form {
            let mut settings = KindSettings::relay(kind).writeable(writeable);
            if current.kind.is_binary() {
                settings.min = current.min;
                settings.max = current.max;
                settings.step = current.step;
            }
            settings
        } else {
            let number = |field: SetupField| {
                update
                    .get(field)
                    .and_then(parse_f32)
                    .ok_or(Error::ValueOutOfRange {
                        field,
                        max: kind.max_value(),
                    })
            };
            KindSettings {
                kind,
                pin,
                min: number(SetupField::Min)?,
                max: number(SetupField::Max)?,
                step: number(SetupField::Step)?,
                writeable,
            }
        };

        self.check_settings(index, &settings)?;

        let name = update.get(SetupField::Name).unwrap_or_default();
        let description = update.get(SetupField::Description).unwrap_or_default();
        check_text(SetupField::Name, name)?;
        check_text(SetupField::Description, description)?;

        Ok(ValidatedSetup {
            name: String::from(name),
            description: String::from(description),
            settings,
        })
    }

    /// Runs the kind, pin, range and ordering checks on the settings of the
    /// switch at `index`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failed check.
    pub fn check_settings(&self, index: usize, settings: &KindSettings) -> Result<()> {
        let kind = settings.kind;
        if !kind.is_operable() {
            return Err(Error::InvalidKind {
                value: String::from(kind.name()),
            });
        }

        self.check_pin(index, kind, settings.pin)?;

        let max_value = kind.max_value();
        for (field, value) in [
            (SetupField::Min, settings.min),
            (SetupField::Max, settings.max),
            (SetupField::Step, settings.step),
        ] {
            if !(MIN_VALUE..=max_value).contains(&value) {
                return Err(Error::ValueOutOfRange {
                    field,
                    max: max_value,
                });
            }
        }

        if settings.min > settings.max {
            return Err(Error::InvalidRange {
                min: settings.min,
                max: settings.max,
            });
        }

        Ok(())
    }

    fn check_pin(&self, index: usize, kind: SwitchKind, pin: Pin) -> Result<()> {
        if pin.is_null() {
            return Ok(());
        }
        if kind.is_binary() {
            return Err(Error::UnexpectedPin { pin, kind });
        }
        if !self.pins.contains(pin) {
            return Err(Error::PinOutOfRange { pin });
        }
        match self
            .switches
            .iter()
            .enumerate()
            .find(|(owner, switch)| *owner != index && switch.kind.is_analog() && switch.pin == pin)
        {
            Some((owner, _)) => Err(Error::PinInUse { pin, owner }),
            None => Ok(()),
        }
    }
}

fn parse_kind(value: &str) -> Result<SwitchKind> {
    parse_i32(value)
        .and_then(SwitchKind::from_id)
        .filter(|kind| kind.is_operable())
        .ok_or_else(|| Error::InvalidKind {
            value: String::from(value),
        })
}
