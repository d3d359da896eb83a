use hashbrown::DefaultHashBuilder;

use indexmap::set::{IndexSet, Iter};

use serde::Serialize;

/// The pin assigned to switches which are not driven through a pin.
pub const NULL_PIN: Pin = Pin(0);

/// Pins available for `PWM` and `DAC` outputs on an `ESP8266-01` board.
///
/// `GPIO0`, `GPIO1`, and `GPIO2` are taken by the serial and I²C lines.
pub const ESP8266_01_PINS: &[i32] = &[3];

/// Pins available for `PWM` and `DAC` outputs on an `ESP8266-12` board.
///
/// `GPIO4` and `GPIO5` are reserved for the I²C bus.
pub const ESP8266_12_PINS: &[i32] = &[2, 14, 12, 13, 15];

/// A hardware pin identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct Pin(i32);

impl core::fmt::Display for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Pin {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl Pin {
    /// Creates a [`Pin`].
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the pin identifier.
    #[must_use]
    pub const fn id(self) -> i32 {
        self.0
    }

    /// Whether this is the [`NULL_PIN`].
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == NULL_PIN.0
    }
}

/// The fixed set of pins a device can assign to analog switches.
///
/// The [`NULL_PIN`] is never part of a pin map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct PinMap(IndexSet<Pin, DefaultHashBuilder>);

impl PinMap {
    /// Creates an empty [`PinMap`].
    ///
    /// A device with an empty pin map can only drive analog outputs through
    /// the [`NULL_PIN`].
    #[must_use]
    pub fn empty() -> Self {
        Self(IndexSet::with_hasher(DefaultHashBuilder::default()))
    }

    /// Creates a [`PinMap`] from a slice of pin identifiers.
    ///
    /// Duplicates and the [`NULL_PIN`] are discarded.
    #[must_use]
    pub fn from_ids(ids: &[i32]) -> Self {
        let mut pins = Self::empty();
        for id in ids {
            pins.add(Pin::new(*id));
        }
        pins
    }

    /// Adds a [`Pin`].
    pub fn add(&mut self, pin: Pin) {
        if !pin.is_null() {
            let _ = self.0.insert(pin);
        }
    }

    /// Whether the [`Pin`] belongs to the map.
    #[must_use]
    pub fn contains(&self, pin: Pin) -> bool {
        self.0.contains(&pin)
    }

    /// Returns the number of pins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the pins, in insertion order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, Pin> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a PinMap {
    type Item = &'a Pin;
    type IntoIter = Iter<'a, Pin>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
