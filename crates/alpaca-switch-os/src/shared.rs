use std::sync::Arc;
use std::time::Duration;

use alpaca_switch::error::{Error, Result};
use alpaca_switch::output::SwitchOutput;
use alpaca_switch::parameters::ParameterSource;
use alpaca_switch::response::StatusResponse;
use alpaca_switch::state::{DeviceState, SetupOutcome};
use alpaca_switch::store::{ConfigStore, LoadOutcome, Storage};

use tokio::sync::Mutex;

use tracing::{error, info, warn};

/// How many times, and how often, a failing storage is read at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    /// Creates a [`RetryPolicy`].
    ///
    /// At least one attempt is always made.
    #[must_use]
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: if attempts == 0 { 1 } else { attempts },
            delay,
        }
    }

    /// Returns the maximum number of attempts.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the delay between two attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

/// Loads a [`DeviceState`], retrying when the storage cannot be accessed.
///
/// Only [`Error::StorageIo`] failures are retried.
///
/// # Errors
///
/// Fails with the last error once all attempts are exhausted.
pub async fn boot<S: Storage>(
    store: &mut ConfigStore<S>,
    policy: RetryPolicy,
) -> Result<(DeviceState, LoadOutcome)> {
    let mut attempt = 1;
    loop {
        match DeviceState::boot(store) {
            Ok(booted) => return Ok(booted),
            Err(Error::StorageIo(reason)) if attempt < policy.attempts => {
                warn!(
                    "Boot attempt {attempt}/{} failed: {reason}",
                    policy.attempts
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!("Unable to boot: {e}");
                return Err(e);
            }
        }
    }
}

struct Device<O, S: Storage> {
    state: DeviceState,
    output: O,
    store: ConfigStore<S>,
}

/// A [`DeviceState`] shared among concurrent request handlers.
///
/// Every operation holds the device lock from validation to persistence,
/// so requests are applied one at a time.
pub struct SharedDevice<O, S: Storage> {
    device: Arc<Mutex<Device<O, S>>>,
}

impl<O, S: Storage> Clone for SharedDevice<O, S> {
    fn clone(&self) -> Self {
        Self {
            device: Arc::clone(&self.device),
        }
    }
}

impl<O, S> SharedDevice<O, S>
where
    O: SwitchOutput,
    S: Storage,
{
    /// Creates a [`SharedDevice`] from an already loaded state.
    #[must_use]
    pub fn new(state: DeviceState, output: O, store: ConfigStore<S>) -> Self {
        Self {
            device: Arc::new(Mutex::new(Device {
                state,
                output,
                store,
            })),
        }
    }

    /// Boots a [`SharedDevice`].
    ///
    /// A restored configuration is immediately driven to the outputs. A
    /// bootstrapped one is not, since the device must restart.
    ///
    /// # Errors
    ///
    /// Fails when the storage cannot be accessed within the [`RetryPolicy`],
    /// or when the outputs cannot be restored.
    pub async fn boot(
        mut store: ConfigStore<S>,
        mut output: O,
        policy: RetryPolicy,
    ) -> Result<(Self, LoadOutcome)> {
        let (state, outcome) = boot(&mut store, policy).await?;
        if outcome == LoadOutcome::Restored {
            state.restore_outputs(&mut output)?;
        }
        info!(
            "Device `{}` booted with {} switches",
            state.config().get_hostname(),
            state.registry().count()
        );
        Ok((Self::new(state, output, store), outcome))
    }

    /// Returns a snapshot of the whole device.
    pub async fn status(&self) -> StatusResponse {
        self.device.lock().await.state.status()
    }

    /// Returns a snapshot of the whole device as `JSON`.
    ///
    /// # Errors
    ///
    /// Fails when the snapshot cannot be serialized.
    pub async fn status_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.status().await)
    }

    /// Runs `f` on the device state while holding the device lock.
    pub async fn with_state<T>(&self, f: impl FnOnce(&DeviceState) -> T) -> T {
        f(&self.device.lock().await.state)
    }

    /// Opens or closes a relay.
    ///
    /// # Errors
    ///
    /// Fails as [`DeviceState::set_switch_value`].
    pub async fn set_switch_value(&self, index: usize, state: bool) -> Result<()> {
        let mut device = self.device.lock().await;
        let Device {
            state: device_state,
            output,
            ..
        } = &mut *device;
        device_state
            .set_switch_value(index, state, output)
            .inspect_err(|e| warn!("Switch {index} not changed: {e}"))
    }

    /// Sets the value of an analog output.
    ///
    /// # Errors
    ///
    /// Fails as [`DeviceState::set_switch_analog_value`].
    pub async fn set_switch_analog_value(&self, index: usize, value: f32) -> Result<()> {
        let mut device = self.device.lock().await;
        let Device { state, output, .. } = &mut *device;
        state
            .set_switch_analog_value(index, value, output)
            .inspect_err(|e| warn!("Switch {index} not changed: {e}"))
    }

    /// Applies a switch setup submission and persists it.
    ///
    /// # Errors
    ///
    /// Fails as [`DeviceState::apply_switch_setup`].
    pub async fn apply_switch_setup<P>(&self, params: &P) -> Result<SetupOutcome>
    where
        P: ParameterSource + ?Sized,
    {
        let mut device = self.device.lock().await;
        let Device {
            state,
            output,
            store,
        } = &mut *device;
        state.apply_switch_setup(params, output, store)
    }

    /// Applies a device setup submission and persists it.
    ///
    /// # Errors
    ///
    /// Fails as [`DeviceState::apply_device_setup`].
    pub async fn apply_device_setup<P>(&self, params: &P) -> Result<SetupOutcome>
    where
        P: ParameterSource + ?Sized,
    {
        let mut device = self.device.lock().await;
        let Device { state, store, .. } = &mut *device;
        let outcome = state.apply_device_setup(params, store)?;
        if outcome == SetupOutcome::RestartRequired {
            warn!("Device setup changed, a restart is required");
        }
        Ok(outcome)
    }
}
