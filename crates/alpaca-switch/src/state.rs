use log::{info, warn};

use crate::config::DeviceConfig;
use crate::error::{Error, Result};
use crate::output::SwitchOutput;
use crate::parameters::{ParameterSource, parse_i32};
use crate::registry::{MAX_SWITCH, SwitchRegistry};
use crate::response::StatusResponse;
use crate::setup::{SetupField, SwitchUpdate};
use crate::store::{ConfigStore, LoadOutcome, Storage};

/// The effect of an accepted setup submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    /// The change is effective immediately.
    Applied,
    /// The change is persisted, but only becomes effective after a restart.
    RestartRequired,
}

/// The device configuration and its switches.
///
/// Every change submitted through the setup interface is persisted before
/// it becomes visible: the change is prepared on a copy, saved, and only
/// then committed. Value changes are not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    config: DeviceConfig,
    registry: SwitchRegistry,
}

impl DeviceState {
    /// Creates a [`DeviceState`].
    #[must_use]
    pub const fn new(config: DeviceConfig, registry: SwitchRegistry) -> Self {
        Self { config, registry }
    }

    /// Loads the [`DeviceState`] from a [`ConfigStore`].
    ///
    /// # Errors
    ///
    /// Fails when the storage cannot be read or written.
    pub fn boot<S: Storage>(store: &mut ConfigStore<S>) -> Result<(Self, LoadOutcome)> {
        let loaded = store.load()?;
        if loaded.restart_required() {
            warn!("Defaults written to storage, a restart is required");
        }
        Ok((Self::new(loaded.config, loaded.registry), loaded.outcome))
    }

    /// Returns the device configuration.
    #[must_use]
    pub const fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Returns the switches.
    #[must_use]
    pub const fn registry(&self) -> &SwitchRegistry {
        &self.registry
    }

    /// Returns the switches for modification.
    pub fn registry_mut(&mut self) -> &mut SwitchRegistry {
        &mut self.registry
    }

    /// Returns a snapshot of the whole device.
    #[must_use]
    pub fn status(&self) -> StatusResponse {
        StatusResponse::new(&self.config, &self.registry)
    }

    /// Drives every output to the restored state of its switch.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::OutputFailure`] on the first output which cannot
    /// be written.
    pub fn restore_outputs<O: SwitchOutput>(&self, output: &mut O) -> Result<()> {
        for index in 0..self.registry.count() {
            self.registry.restore_output(index, output)?;
        }
        info!("{} outputs restored", self.registry.count());
        Ok(())
    }

    /// Applies a switch setup submission and persists it.
    ///
    /// The switch is selected by the `Id` parameter. The submission is
    /// validated and saved before the hardware is touched. When the
    /// hardware then fails, the previous configuration is saved back and
    /// its outputs are restored.
    ///
    /// # Errors
    ///
    /// Fails when the submission is rejected, when the storage cannot be
    /// written, or when the hardware cannot be configured. The device is
    /// left unchanged on failure.
    pub fn apply_switch_setup<P, O, S>(
        &mut self,
        params: &P,
        output: &mut O,
        store: &mut ConfigStore<S>,
    ) -> Result<SetupOutcome>
    where
        P: ParameterSource + ?Sized,
        O: SwitchOutput,
        S: Storage,
    {
        let index = self.switch_index(params)?;
        let update = SwitchUpdate::collect(params);

        let setup = self.registry.validator().validate(index, &update)?;
        let mut registry = self.registry.clone();
        registry.stage_setup(index, setup)?;
        store.save(&self.config, &registry)?;

        if let Err(error) = registry.restore_output(index, output) {
            warn!("Switch {index} setup reverted: {error}");
            store.save(&self.config, &self.registry)?;
            if let Err(error) = self.registry.restore_output(index, output) {
                warn!("Switch {index} output not restored: {error}");
            }
            return Err(error);
        }

        self.registry = registry;
        Ok(SetupOutcome::Applied)
    }

    /// Applies a device setup submission and persists it.
    ///
    /// A `hostname` parameter, optionally with a `location`, changes the
    /// device identity and requires a restart. Otherwise a `numSwitches`
    /// parameter resizes the switches.
    ///
    /// # Errors
    ///
    /// Fails when the submission is rejected, or when the storage cannot be
    /// written. The device is left unchanged on failure.
    pub fn apply_device_setup<P, S>(
        &mut self,
        params: &P,
        store: &mut ConfigStore<S>,
    ) -> Result<SetupOutcome>
    where
        P: ParameterSource + ?Sized,
        S: Storage,
    {
        if let Some(hostname) = params.get_param(SetupField::Hostname.name()) {
            let mut config = self.config.clone().hostname(hostname)?;
            if let Some(location) = params.get_param(SetupField::Location.name()) {
                config.set_location(location)?;
            }
            return self.update_config(config, store);
        }

        if let Some(count) = params.get_param(SetupField::NumSwitches.name()) {
            let count = parse_i32(count)
                .and_then(|count| usize::try_from(count).ok())
                .ok_or(Error::InvalidCount {
                    count: 0,
                    max: MAX_SWITCH,
                })?;
            return self.resize(count, store);
        }

        Err(Error::IncompleteSubmission {
            missing: SetupField::Hostname,
        })
    }

    /// Changes the number of switches and persists it.
    ///
    /// # Errors
    ///
    /// Fails when the count is rejected by [`SwitchRegistry::resize`], or
    /// when the storage cannot be written. The device is left unchanged on
    /// failure.
    pub fn resize<S: Storage>(
        &mut self,
        count: usize,
        store: &mut ConfigStore<S>,
    ) -> Result<SetupOutcome> {
        let mut registry = self.registry.clone();
        registry.resize(count)?;
        store.save(&self.config, &registry)?;
        self.registry = registry;
        Ok(SetupOutcome::Applied)
    }

    /// Changes the hostname and persists it.
    ///
    /// # Errors
    ///
    /// Fails when the hostname is rejected, or when the storage cannot be
    /// written. The device is left unchanged on failure.
    pub fn update_hostname<S: Storage>(
        &mut self,
        hostname: &str,
        store: &mut ConfigStore<S>,
    ) -> Result<SetupOutcome> {
        let config = self.config.clone().hostname(hostname)?;
        self.update_config(config, store)
    }

    /// Opens or closes a relay.
    ///
    /// # Errors
    ///
    /// Fails as [`SwitchRegistry::set_value`].
    pub fn set_switch_value<O: SwitchOutput>(
        &mut self,
        index: usize,
        state: bool,
        output: &mut O,
    ) -> Result<()> {
        self.registry.set_value(index, state, output)
    }

    /// Sets the value of an analog output.
    ///
    /// # Errors
    ///
    /// Fails as [`SwitchRegistry::set_analog_value`].
    pub fn set_switch_analog_value<O: SwitchOutput>(
        &mut self,
        index: usize,
        value: f32,
        output: &mut O,
    ) -> Result<()> {
        self.registry.set_analog_value(index, value, output)
    }

    fn update_config<S: Storage>(
        &mut self,
        config: DeviceConfig,
        store: &mut ConfigStore<S>,
    ) -> Result<SetupOutcome> {
        store.save(&config, &self.registry)?;
        info!("Device renamed to `{}`, restart required", config.get_hostname());
        self.config = config;
        Ok(SetupOutcome::RestartRequired)
    }

    fn switch_index<P: ParameterSource + ?Sized>(&self, params: &P) -> Result<usize> {
        let id = params
            .get_param(SetupField::Id.name())
            .ok_or(Error::IncompleteSubmission {
                missing: SetupField::Id,
            })?;
        let count = self.registry.count();
        let index = parse_i32(id)
            .and_then(|id| usize::try_from(id).ok())
            .ok_or(Error::index_out_of_range(usize::MAX, count))?;
        let _ = self.registry.get(index)?;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DeviceConfig;
    use crate::error::Error;
    use crate::kind::SwitchKind;
    use crate::parameters::Parameters;
    use crate::pin::{ESP8266_12_PINS, Pin, PinMap};
    use crate::registry::{DEFAULT_NUM_SWITCHES, MAX_SWITCH};
    use crate::setup::SetupField;
    use crate::store::{ConfigStore, LoadOutcome, MAX_RECORD_SIZE, MemoryStorage};
    use crate::test_support::{JournalStorage, RecordingOutput, Write};

    use super::{DeviceState, SetupOutcome};

    fn booted() -> (DeviceState, ConfigStore<MemoryStorage>) {
        let mut store = ConfigStore::new(MemoryStorage::new(MAX_RECORD_SIZE))
            .with_pin_map(PinMap::from_ids(ESP8266_12_PINS));
        let (state, outcome) = DeviceState::boot(&mut store).unwrap();
        assert_eq!(outcome, LoadOutcome::Bootstrapped);
        (state, store)
    }

    fn pwm_setup(id: &str, pin: &str) -> Parameters {
        Parameters::new()
            .with("ID", id)
            .with("switchName", "Flat panel")
            .with("description", "Dimmer")
            .with("type", "2")
            .with("writeable", "on")
            .with("pin", pin)
            .with("min", "0")
            .with("max", "1024")
            .with("step", "1")
    }

    #[test]
    fn test_boot_then_restore() {
        let (mut state, mut store) = booted();
        let mut output = RecordingOutput::default();
        let _ = state
            .apply_switch_setup(&pwm_setup("3", "12"), &mut output, &mut store)
            .unwrap();

        let (restored, outcome) = DeviceState::boot(&mut store).unwrap();
        assert_eq!(outcome, LoadOutcome::Restored);
        assert_eq!(restored, state);
    }

    #[test]
    fn test_apply_switch_setup() {
        let (mut state, mut store) = booted();
        let mut output = RecordingOutput::default();

        assert_eq!(
            state.apply_switch_setup(&pwm_setup("1", "14"), &mut output, &mut store),
            Ok(SetupOutcome::Applied)
        );
        let switch = state.registry().get(1).unwrap();
        assert_eq!(switch.switch_name(), "Flat panel");
        assert_eq!(switch.kind(), SwitchKind::Pwm);
        assert_eq!(store.storage().commits(), 2);

        // The same pin cannot be assigned twice.
        let before = state.clone();
        assert_eq!(
            state.apply_switch_setup(&pwm_setup("2", "14"), &mut output, &mut store),
            Err(Error::PinInUse {
                pin: Pin::new(14),
                owner: 1
            })
        );
        assert_eq!(state, before);
        assert_eq!(store.storage().commits(), 2);
    }

    #[test]
    fn test_switch_setup_index() {
        let (mut state, mut store) = booted();
        let mut output = RecordingOutput::default();

        let parameters = Parameters::new().with("switchName", "Fan");
        assert_eq!(
            state.apply_switch_setup(&parameters, &mut output, &mut store),
            Err(Error::IncompleteSubmission {
                missing: SetupField::Id
            })
        );
        assert_eq!(
            state.apply_switch_setup(&pwm_setup("8", "14"), &mut output, &mut store),
            Err(Error::index_out_of_range(8, DEFAULT_NUM_SWITCHES))
        );
        assert!(output.writes.is_empty());
    }

    #[test]
    fn test_failed_save_keeps_state() {
        let mut storage = JournalStorage::new(MAX_RECORD_SIZE);
        let mut store = ConfigStore::new(&mut storage).with_pin_map(PinMap::from_ids(&[14]));
        let (mut state, _) = DeviceState::boot(&mut store).unwrap();
        store.storage_mut().writes_before_failure = Some(0);

        let before = state.clone();
        let mut output = RecordingOutput::default();
        assert!(matches!(
            state.apply_switch_setup(&pwm_setup("0", "14"), &mut output, &mut store),
            Err(Error::StorageIo(_))
        ));
        assert_eq!(state, before);
        // Nothing reaches the hardware before the setup is saved.
        assert!(output.writes.is_empty());
    }

    #[test]
    fn test_switch_setup_order() {
        let (mut state, mut store) = booted();
        let mut output = RecordingOutput::default();

        let _ = state
            .apply_switch_setup(&pwm_setup("0", "14"), &mut output, &mut store)
            .unwrap();
        assert_eq!(
            output.writes,
            [
                Write::Configure {
                    index: 0,
                    kind: SwitchKind::Pwm,
                    pin: Pin::new(14)
                },
                Write::Analog {
                    index: 0,
                    pin: Pin::new(14),
                    level: 0.0
                }
            ]
        );
    }

    #[test]
    fn test_output_failure_reverts_setup() {
        let (mut state, mut store) = booted();
        let before = state.clone();

        let mut output = RecordingOutput::failing();
        assert!(matches!(
            state.apply_switch_setup(&pwm_setup("0", "14"), &mut output, &mut store),
            Err(Error::OutputFailure { index: 0, .. })
        ));
        assert_eq!(state, before);

        // The previous configuration was saved back.
        assert_eq!(store.storage().commits(), 3);
        let (restored, outcome) = DeviceState::boot(&mut store).unwrap();
        assert_eq!(outcome, LoadOutcome::Restored);
        assert_eq!(restored, before);
    }

    #[test]
    fn test_device_setup() {
        let (mut state, mut store) = booted();

        let parameters = Parameters::new()
            .with("hostname", "dome-relays")
            .with("location", "Roof");
        assert_eq!(
            state.apply_device_setup(&parameters, &mut store),
            Ok(SetupOutcome::RestartRequired)
        );
        assert_eq!(state.config().get_hostname(), "dome-relays");
        assert_eq!(state.status().location, "Roof");

        let parameters = Parameters::new().with("numSwitches", "3");
        assert_eq!(
            state.apply_device_setup(&parameters, &mut store),
            Ok(SetupOutcome::Applied)
        );
        assert_eq!(state.registry().count(), 3);

        let (restored, _) = DeviceState::boot(&mut store).unwrap();
        assert_eq!(restored.config().get_hostname(), "dome-relays");
        assert_eq!(restored.registry().count(), 3);
    }

    #[test]
    fn test_rejected_device_setup() {
        let (mut state, mut store) = booted();

        assert_eq!(
            state.update_hostname("my host", &mut store),
            Err(Error::InvalidHostname {
                hostname: "my host".into()
            })
        );
        for count in ["0", "9", "-1", "many"] {
            let parameters = Parameters::new().with("numSwitches", count);
            assert!(matches!(
                state.apply_device_setup(&parameters, &mut store),
                Err(Error::InvalidCount { max: MAX_SWITCH, .. })
            ));
        }
        assert_eq!(
            state.apply_device_setup(&Parameters::new(), &mut store),
            Err(Error::IncompleteSubmission {
                missing: SetupField::Hostname
            })
        );
        assert_eq!(state.config(), &DeviceConfig::new());
        assert_eq!(state.registry().count(), DEFAULT_NUM_SWITCHES);
        assert_eq!(store.storage().commits(), 1);
    }

    #[test]
    fn test_restore_outputs() {
        let (mut state, mut store) = booted();
        let mut output = RecordingOutput::default();
        let _ = state.resize(2, &mut store).unwrap();
        state.set_switch_value(0, true, &mut output).unwrap();
        output.writes.clear();

        state.restore_outputs(&mut output).unwrap();
        assert_eq!(
            output.writes,
            [
                Write::Configure {
                    index: 0,
                    kind: SwitchKind::RelayNo,
                    pin: Pin::new(0)
                },
                Write::Digital {
                    index: 0,
                    pin: Pin::new(0),
                    energized: true
                },
                Write::Configure {
                    index: 1,
                    kind: SwitchKind::RelayNo,
                    pin: Pin::new(0)
                },
                Write::Digital {
                    index: 1,
                    pin: Pin::new(0),
                    energized: false
                },
            ]
        );
    }
}
