use serde::Serialize;

/// All [`SwitchKind`]s a switch can be configured with.
pub const OPERABLE_KINDS: &[SwitchKind] = &[
    SwitchKind::RelayNo,
    SwitchKind::RelayNc,
    SwitchKind::Pwm,
    SwitchKind::Dac,
];

/// The kind of a switch.
///
/// The integer identifier of each kind is shared by the wire protocol and
/// the persisted record layout, so identifiers are **append-only**: adding a
/// kind must never renumber the existing ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum SwitchKind {
    /// A normally-open relay.
    #[default]
    RelayNo,
    /// A normally-closed relay.
    RelayNc,
    /// A pulse-width modulated output.
    Pwm,
    /// A digital-to-analog converter output.
    Dac,
    /// No kind has been selected yet.
    NotSelected,
}

impl core::fmt::Display for SwitchKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl SwitchKind {
    /// Returns the [`SwitchKind`] name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RelayNo => "Relay_NO",
            Self::RelayNc => "Relay_NC",
            Self::Pwm => "PWM",
            Self::Dac => "DAC",
            Self::NotSelected => "Not Selected",
        }
    }

    /// Returns the identifier associated with the [`SwitchKind`].
    #[must_use]
    pub const fn id(self) -> i32 {
        match self {
            Self::RelayNo => 0,
            Self::RelayNc => 1,
            Self::Pwm => 2,
            Self::Dac => 3,
            Self::NotSelected => 4,
        }
    }

    /// Returns the [`SwitchKind`] associated with the given integer
    /// identifier.
    ///
    /// The return value is [`None`] when the identifier does not exist.
    #[must_use]
    pub const fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Self::RelayNo),
            1 => Some(Self::RelayNc),
            2 => Some(Self::Pwm),
            3 => Some(Self::Dac),
            4 => Some(Self::NotSelected),
            _ => None,
        }
    }

    /// Whether the switch only has two states, open and closed.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::RelayNo | Self::RelayNc)
    }

    /// Whether the switch takes a value in a continuous range.
    #[must_use]
    pub const fn is_analog(self) -> bool {
        matches!(self, Self::Pwm | Self::Dac)
    }

    /// Whether a switch can be configured with this kind.
    #[must_use]
    pub const fn is_operable(self) -> bool {
        self.is_binary() || self.is_analog()
    }

    /// Returns the upper bound of `min`, `max`, and `step` for this kind.
    ///
    /// [`SwitchKind::NotSelected`] falls back to the binary bound.
    #[must_use]
    pub const fn max_value(self) -> f32 {
        if self.is_analog() {
            MAX_DIGITAL_VALUE
        } else {
            MAX_BINARY_VALUE
        }
    }
}

/// The resolution of `PWM` and `DAC` outputs.
pub const MAX_DIGITAL_VALUE: f32 = 1024.0;
/// The closed state of a relay.
pub const MAX_BINARY_VALUE: f32 = 1.0;
/// The lower bound of every switch range.
pub const MIN_VALUE: f32 = 0.0;
