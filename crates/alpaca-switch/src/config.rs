use alloc::string::String;

use serde::Serialize;

use log::debug;

use crate::descriptor::check_text;
use crate::error::{Error, Result};
use crate::setup::SetupField;

/// The `UDP` port on which ASCOM Alpaca discovery requests are received.
pub const ALPACA_DISCOVERY_PORT: u16 = 32227;

/// Hostname of a device booted from an uninitialized storage.
pub const DEFAULT_HOSTNAME: &str = "espRLY01";

/// Location of a device booted from an uninitialized storage.
pub const DEFAULT_LOCATION: &str = "Unknown";

/// Checks a hostname.
///
/// A hostname is a single non-empty `DNS` label made of `ASCII`
/// alphanumeric characters and `-`, which fits in the persisted field.
///
/// # Errors
///
/// Fails with [`Error::InvalidHostname`] when the hostname is not valid.
pub fn check_hostname(hostname: &str) -> Result<()> {
    let invalid = || Error::InvalidHostname {
        hostname: String::from(hostname),
    };
    check_text(SetupField::Hostname, hostname).map_err(|_| invalid())?;
    if hostname.is_empty()
        || hostname.starts_with('-')
        || hostname.ends_with('-')
        || !hostname
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-')
    {
        return Err(invalid());
    }
    Ok(())
}

/// Checks a discovery port.
///
/// # Errors
///
/// Fails with [`Error::InvalidPort`] when the port is not strictly between
/// `1024` and `65535`.
pub fn check_port(port: i64) -> Result<u16> {
    match u16::try_from(port) {
        Ok(port) if port > 1024 && port < u16::MAX => Ok(port),
        _ => Err(Error::InvalidPort { port }),
    }
}

/// The device-wide configuration.
///
/// The number of switches is not part of the configuration, it is always
/// the length of the [`SwitchRegistry`](crate::registry::SwitchRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct DeviceConfig {
    hostname: String,
    location: String,
    discovery_port: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceConfig {
    /// Creates a [`DeviceConfig`] with the default hostname, location and
    /// discovery port.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hostname: String::from(DEFAULT_HOSTNAME),
            location: String::from(DEFAULT_LOCATION),
            discovery_port: ALPACA_DISCOVERY_PORT,
        }
    }

    /// Sets the hostname.
    ///
    /// # Errors
    ///
    /// Fails when the hostname is rejected by [`check_hostname`].
    pub fn hostname(mut self, hostname: &str) -> Result<Self> {
        self.set_hostname(hostname)?;
        Ok(self)
    }

    /// Sets the location.
    ///
    /// # Errors
    ///
    /// Fails when the location does not fit in the persisted field.
    pub fn location(mut self, location: &str) -> Result<Self> {
        self.set_location(location)?;
        Ok(self)
    }

    /// Sets the discovery port.
    ///
    /// # Errors
    ///
    /// Fails when the port is rejected by [`check_port`].
    pub fn discovery_port(mut self, port: i64) -> Result<Self> {
        self.set_discovery_port(port)?;
        Ok(self)
    }

    /// Changes the hostname.
    ///
    /// # Errors
    ///
    /// Fails when the hostname is rejected by [`check_hostname`].
    pub fn set_hostname(&mut self, hostname: &str) -> Result<()> {
        check_hostname(hostname)?;
        debug!("Hostname changed from `{}` to `{hostname}`", self.hostname);
        self.hostname = String::from(hostname);
        Ok(())
    }

    /// Changes the location.
    ///
    /// # Errors
    ///
    /// Fails when the location does not fit in the persisted field.
    pub fn set_location(&mut self, location: &str) -> Result<()> {
        check_text(SetupField::Location, location)?;
        self.location = String::from(location);
        Ok(())
    }

    /// Changes the discovery port.
    ///
    /// # Errors
    ///
    /// Fails when the port is rejected by [`check_port`].
    pub fn set_discovery_port(&mut self, port: i64) -> Result<()> {
        self.discovery_port = check_port(port)?;
        Ok(())
    }

    /// Returns the hostname.
    #[must_use]
    pub fn get_hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the location.
    #[must_use]
    pub fn get_location(&self) -> &str {
        &self.location
    }

    /// Returns the discovery port.
    #[must_use]
    pub const fn get_discovery_port(&self) -> u16 {
        self.discovery_port
    }
}
