use alloc::string::String;

use hashbrown::HashMap;

/// A source of request parameters.
///
/// Parameter names are compared case-insensitively, as ASCOM Alpaca clients
/// are free to pick the case of the names they send.
pub trait ParameterSource {
    /// Returns the value of the parameter called `name`, if present.
    fn get_param(&self, name: &str) -> Option<&str>;

    /// Whether the parameter called `name` is present.
    fn has_param(&self, name: &str) -> bool {
        self.get_param(name).is_some()
    }
}

/// A collection of request parameters decoded by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters(HashMap<String, String>);

impl Parameters {
    /// Creates an empty [`Parameters`].
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Adds a parameter.
    #[must_use]
    #[inline]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts a parameter, replacing any previous value with the same
    /// case-insensitive name.
    pub fn insert(&mut self, name: &str, value: &str) {
        let _ = self
            .0
            .insert(name.to_ascii_lowercase(), String::from(value));
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ParameterSource for Parameters {
    fn get_param(&self, name: &str) -> Option<&str> {
        self.0
            .get(name.to_ascii_lowercase().as_str())
            .map(String::as_str)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut parameters = Self::new();
        for (name, value) in iter {
            parameters.insert(name, value);
        }
        parameters
    }
}

/// Parses a boolean parameter value.
///
/// Accepts `true`, `on`, `1` and `false`, `off`, `0`, ignoring case and
/// surrounding whitespace. HTML check boxes submit `on`.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("on") || value == "1" {
        Some(true)
    } else if value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("off")
        || value == "0"
    {
        Some(false)
    } else {
        None
    }
}

/// Parses a finite floating-point parameter value.
#[must_use]
pub fn parse_f32(value: &str) -> Option<f32> {
    value.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Parses an integer parameter value.
#[must_use]
pub fn parse_i32(value: &str) -> Option<i32> {
    value.trim().parse::<i32>().ok()
}
