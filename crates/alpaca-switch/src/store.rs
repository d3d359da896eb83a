use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use log::{info, warn};

use crate::config::DeviceConfig;
use crate::descriptor::{MAX_NAME_LENGTH, SwitchDescriptor};
use crate::error::{Error, Result};
use crate::kind::SwitchKind;
use crate::output::AnalogUnit;
use crate::pin::{Pin, PinMap};
use crate::registry::{MAX_SWITCH, SwitchRegistry, check_switches};

/// First byte of an initialized record.
///
/// The magic byte is also the version of the record layout: changing the
/// layout requires changing the magic byte.
pub const MAGIC: u8 = b'*';

/// Offset of the switch count.
pub const COUNT_OFFSET: usize = 1;
/// Offset of the discovery port.
pub const PORT_OFFSET: usize = 5;
/// Offset of the hostname.
pub const HOSTNAME_OFFSET: usize = 9;

/// Size in bytes of the record header.
pub const HEADER_SIZE: usize = HOSTNAME_OFFSET + MAX_NAME_LENGTH;

/// Size in bytes of a persisted switch.
pub const SWITCH_RECORD_SIZE: usize = 4 + 4 + 1 + 4 * 4 + 2 * MAX_NAME_LENGTH;

/// Size in bytes of the record trailer.
pub const TRAILER_SIZE: usize = MAX_NAME_LENGTH;

/// Returns the size in bytes of the record of a device with `count`
/// switches.
#[must_use]
pub const fn record_size(count: usize) -> usize {
    HEADER_SIZE + count * SWITCH_RECORD_SIZE + TRAILER_SIZE
}

/// Size in bytes of the largest record.
pub const MAX_RECORD_SIZE: usize = record_size(MAX_SWITCH);

/// A byte-addressable non-volatile medium.
///
/// Writes may be buffered until [`Storage::commit`] is called.
pub trait Storage {
    /// Fills `buffer` with the bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::StorageIo`] when the bytes cannot be read, also
    /// when the range exceeds the capacity.
    fn read_bytes(&mut self, offset: usize, buffer: &mut [u8]) -> Result<()>;

    /// Writes `bytes` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::StorageIo`] when the bytes cannot be written,
    /// also when the range exceeds the capacity.
    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()>;

    /// Makes all previous writes durable.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::StorageIo`] when the writes cannot be flushed.
    fn commit(&mut self) -> Result<()>;

    /// Returns the capacity in bytes.
    fn capacity(&self) -> usize;
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn read_bytes(&mut self, offset: usize, buffer: &mut [u8]) -> Result<()> {
        (**self).read_bytes(offset, buffer)
    }

    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(offset, bytes)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }
}

/// A [`Storage`] held in memory, initialized as an erased memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStorage {
    bytes: Vec<u8>,
    commits: usize,
}

impl MemoryStorage {
    /// Value of an erased byte.
    pub const ERASED: u8 = 0xFF;

    /// Creates an erased [`MemoryStorage`] of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![Self::ERASED; capacity],
            commits: 0,
        }
    }

    /// Returns the stored bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the stored bytes for modification.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Returns the number of commits.
    #[must_use]
    pub const fn commits(&self) -> usize {
        self.commits
    }

    fn range(&self, offset: usize, len: usize) -> Result<core::ops::Range<usize>> {
        offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .map(|end| offset..end)
            .ok_or_else(|| {
                Error::StorageIo(alloc::format!(
                    "range {offset}+{len} exceeds capacity {}",
                    self.bytes.len()
                ))
            })
    }
}

impl Storage for MemoryStorage {
    fn read_bytes(&mut self, offset: usize, buffer: &mut [u8]) -> Result<()> {
        let range = self.range(offset, buffer.len())?;
        buffer.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let range = self.range(offset, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

/// How the configuration was obtained by [`ConfigStore::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Restored from the storage.
    Restored,
    /// The storage was not initialized or was corrupt, defaults have been
    /// written. The device must restart.
    Bootstrapped,
}

/// The configuration returned by [`ConfigStore::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    /// Device configuration.
    pub config: DeviceConfig,
    /// Switches.
    pub registry: SwitchRegistry,
    /// How the configuration was obtained.
    pub outcome: LoadOutcome,
}

impl Loaded {
    /// Whether the device must restart before serving requests.
    #[must_use]
    pub fn restart_required(&self) -> bool {
        self.outcome == LoadOutcome::Bootstrapped
    }
}

/// Persists the device configuration and its switches to a [`Storage`].
///
/// Record layout, in native byte order:
///
/// | Offset | Size | Field           |
/// |--------|------|-----------------|
/// | 0      | 1    | magic           |
/// | 1      | 4    | switch count    |
/// | 5      | 4    | discovery port  |
/// | 9      | 25   | hostname        |
/// | 34     | 75×n | switches        |
/// | …      | 25   | location        |
///
/// Each switch is `kind:4 pin:4 writeable:1 min:4 max:4 step:4 value:4
/// name:25 description:25`. Texts are `NUL` padded.
#[derive(Debug)]
pub struct ConfigStore<S: Storage> {
    storage: S,
    pins: PinMap,
    analog_unit: AnalogUnit,
}

impl<S: Storage> ConfigStore<S> {
    /// Creates a [`ConfigStore`].
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            pins: PinMap::empty(),
            analog_unit: AnalogUnit::default(),
        }
    }

    /// Sets the [`PinMap`] assigned to the loaded registries.
    #[must_use]
    #[inline]
    pub fn with_pin_map(mut self, pins: PinMap) -> Self {
        self.pins = pins;
        self
    }

    /// Sets the [`AnalogUnit`] assigned to the loaded registries.
    #[must_use]
    #[inline]
    pub fn analog_unit(mut self, analog_unit: AnalogUnit) -> Self {
        self.analog_unit = analog_unit;
        self
    }

    /// Returns the underlying storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the underlying storage for modification.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Consumes the store, returning the underlying storage.
    #[must_use]
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Loads the configuration.
    ///
    /// An uninitialized or corrupt record is replaced by the default
    /// configuration, which is saved before returning
    /// [`LoadOutcome::Bootstrapped`].
    ///
    /// # Errors
    ///
    /// Fails when the storage cannot be read or written.
    pub fn load(&mut self) -> Result<Loaded> {
        match self.restore() {
            Ok((config, registry)) => {
                info!(
                    "Configuration of `{}` restored with {} switches",
                    config.get_hostname(),
                    registry.count()
                );
                Ok(Loaded {
                    config,
                    registry: self.attach(registry),
                    outcome: LoadOutcome::Restored,
                })
            }
            Err(Error::StorageCorrupt(reason)) => {
                warn!("Stored configuration discarded ({reason}), writing defaults");
                let config = DeviceConfig::new();
                let registry = self.attach(SwitchRegistry::new());
                self.save(&config, &registry)?;
                Ok(Loaded {
                    config,
                    registry,
                    outcome: LoadOutcome::Bootstrapped,
                })
            }
            Err(error) => Err(error),
        }
    }

    /// Saves the configuration.
    ///
    /// The magic byte is written after every other byte, then the writes
    /// are committed.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::StorageFull`] when the record exceeds the storage
    /// capacity, or when the storage cannot be written.
    pub fn save(&mut self, config: &DeviceConfig, registry: &SwitchRegistry) -> Result<()> {
        let record = encode(config, registry);
        let capacity = self.storage.capacity();
        if record.len() > capacity {
            return Err(Error::StorageFull {
                needed: record.len(),
                capacity,
            });
        }

        self.storage.write_bytes(COUNT_OFFSET, &record[COUNT_OFFSET..])?;
        self.storage.write_bytes(0, &[MAGIC])?;
        self.storage.commit()?;

        info!(
            "Configuration saved with {} switches ({} bytes)",
            registry.count(),
            record.len()
        );
        Ok(())
    }

    fn attach(&self, registry: SwitchRegistry) -> SwitchRegistry {
        registry
            .with_pin_map(self.pins.clone())
            .analog_unit(self.analog_unit)
    }

    fn restore(&mut self) -> Result<(DeviceConfig, SwitchRegistry)> {
        if self.storage.capacity() < record_size(1) {
            return Err(Error::StorageCorrupt("storage smaller than a record"));
        }

        let mut header = [0; HEADER_SIZE];
        self.storage.read_bytes(0, &mut header)?;
        if header[0] != MAGIC {
            return Err(Error::StorageCorrupt("magic byte mismatch"));
        }

        let mut fields = Decoder::new(&header[COUNT_OFFSET..]);
        let count = usize::try_from(fields.i32()?)
            .ok()
            .filter(|count| (1..=MAX_SWITCH).contains(count))
            .ok_or(Error::StorageCorrupt("switch count out of range"))?;
        if record_size(count) > self.storage.capacity() {
            return Err(Error::StorageCorrupt("switch count exceeds storage"));
        }
        let port = fields.i32()?;
        let hostname = fields.text()?;

        let mut body = vec![0; record_size(count) - HEADER_SIZE];
        self.storage.read_bytes(HEADER_SIZE, &mut body)?;
        let mut fields = Decoder::new(&body);
        let switches = (0..count)
            .map(|_| fields.switch())
            .collect::<Result<Vec<_>>>()?;
        let location = fields.text()?;

        let config = DeviceConfig::new()
            .hostname(&hostname)
            .and_then(|config| config.location(&location))
            .map_err(|_| Error::StorageCorrupt("invalid device text"))?
            .discovery_port(i64::from(port))
            .map_err(|_| Error::StorageCorrupt("invalid discovery port"))?;

        check_switches(&switches, &self.pins).map_err(|error| {
            warn!("Stored switches rejected: {error}");
            Error::StorageCorrupt("invalid switch settings")
        })?;
        let registry = SwitchRegistry::from_switches(switches)
            .map_err(|_| Error::StorageCorrupt("switch count out of range"))?;
        Ok((config, registry))
    }
}

fn encode(config: &DeviceConfig, registry: &SwitchRegistry) -> Vec<u8> {
    let mut record = Encoder(Vec::with_capacity(record_size(registry.count())));
    record.u8(MAGIC);
    // The registry never holds more than `MAX_SWITCH` switches.
    record.i32(i32::try_from(registry.count()).unwrap_or(i32::MAX));
    record.i32(i32::from(config.get_discovery_port()));
    record.text(config.get_hostname());
    for switch in registry {
        record.switch(switch);
    }
    record.text(config.get_location());
    record.0
}

struct Encoder(Vec<u8>);

impl Encoder {
    fn u8(&mut self, value: u8) {
        self.0.push(value);
    }

    fn i32(&mut self, value: i32) {
        self.0.extend_from_slice(&value.to_ne_bytes());
    }

    fn f32(&mut self, value: f32) {
        self.0.extend_from_slice(&value.to_ne_bytes());
    }

    // Texts are already checked to be shorter than the field.
    fn text(&mut self, text: &str) {
        let mut len = text.len().min(MAX_NAME_LENGTH - 1);
        while !text.is_char_boundary(len) {
            len -= 1;
        }
        self.0.extend_from_slice(&text.as_bytes()[..len]);
        self.0.resize(self.0.len() + MAX_NAME_LENGTH - len, 0);
    }

    fn switch(&mut self, switch: &SwitchDescriptor) {
        self.i32(switch.kind.id());
        self.i32(switch.pin.id());
        self.u8(u8::from(switch.writeable));
        self.f32(switch.min);
        self.f32(switch.max);
        self.f32(switch.step);
        self.f32(switch.value);
        self.text(&switch.switch_name);
        self.text(&switch.description);
    }
}

struct Decoder<'a> {
    bytes: &'a [u8],
}

impl<'a> Decoder<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let (head, tail) = self
            .bytes
            .split_first_chunk::<N>()
            .ok_or(Error::StorageCorrupt("truncated record"))?;
        self.bytes = tail;
        Ok(*head)
    }

    fn u8(&mut self) -> Result<u8> {
        self.take::<1>().map(|[byte]| byte)
    }

    fn i32(&mut self) -> Result<i32> {
        self.take().map(i32::from_ne_bytes)
    }

    fn f32(&mut self) -> Result<f32> {
        let value = f32::from_ne_bytes(self.take()?);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::StorageCorrupt("non-finite value"))
        }
    }

    fn text(&mut self) -> Result<String> {
        let field = self.take::<MAX_NAME_LENGTH>()?;
        let len = field
            .iter()
            .position(|byte| *byte == 0)
            .ok_or(Error::StorageCorrupt("unterminated text"))?;
        core::str::from_utf8(&field[..len])
            .map(String::from)
            .map_err(|_| Error::StorageCorrupt("invalid text encoding"))
    }

    fn switch(&mut self) -> Result<SwitchDescriptor> {
        let kind = SwitchKind::from_id(self.i32()?)
            .ok_or(Error::StorageCorrupt("unknown switch kind"))?;
        let pin = Pin::new(self.i32()?);
        let writeable = self.u8()? != 0;
        let min = self.f32()?;
        let max = self.f32()?;
        let step = self.f32()?;
        let value = self.f32()?;
        let switch_name = self.text()?;
        let description = self.text()?;
        Ok(SwitchDescriptor {
            switch_name,
            description,
            kind,
            pin,
            writeable,
            min,
            max,
            step,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DeviceConfig;
    use crate::error::Error;
    use crate::kind::SwitchKind;
    use crate::output::AnalogUnit;
    use crate::pin::{Pin, PinMap};
    use crate::registry::{DEFAULT_NUM_SWITCHES, SwitchRegistry};
    use crate::setup::KindSettings;
    use crate::test_support::{JournalStorage, Operation, RecordingOutput};

    use super::{
        COUNT_OFFSET, ConfigStore, HEADER_SIZE, LoadOutcome, MAGIC, MAX_RECORD_SIZE,
        MemoryStorage, PORT_OFFSET, SWITCH_RECORD_SIZE, record_size,
    };

    fn configured() -> (DeviceConfig, SwitchRegistry) {
        let config = DeviceConfig::new()
            .hostname("dome-relays")
            .unwrap()
            .location("North pier")
            .unwrap()
            .discovery_port(32300)
            .unwrap();

        let mut output = RecordingOutput::default();
        let mut registry = SwitchRegistry::with_count(3)
            .unwrap()
            .with_pin_map(PinMap::from_ids(&[2, 14]));
        registry.set_name(0, "Mount power").unwrap();
        registry.set_value(0, true, &mut output).unwrap();
        registry
            .set_kind(
                1,
                KindSettings::analog(SwitchKind::Pwm, Pin::new(14), 0.0, 800.0, 4.0),
                &mut output,
            )
            .unwrap();
        registry.set_analog_value(1, 312.5, &mut output).unwrap();
        registry
            .set_kind(2, KindSettings::relay(SwitchKind::RelayNc).writeable(false), &mut output)
            .unwrap();
        registry.set_description(2, "Heater").unwrap();

        (config, registry)
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(HEADER_SIZE, 34);
        assert_eq!(SWITCH_RECORD_SIZE, 75);
        assert_eq!(record_size(1), 134);
        assert_eq!(MAX_RECORD_SIZE, 659);
    }

    #[test]
    fn test_save_then_load() {
        let (config, registry) = configured();
        let mut store = ConfigStore::new(MemoryStorage::new(MAX_RECORD_SIZE))
            .with_pin_map(PinMap::from_ids(&[2, 14]));

        store.save(&config, &registry).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.outcome, LoadOutcome::Restored);
        assert!(!loaded.restart_required());
        assert_eq!(loaded.config, config);
        assert_eq!(loaded.registry, registry);

        // Saving what was loaded produces the same bytes.
        let bytes = store.storage().bytes().to_vec();
        store.save(&loaded.config, &loaded.registry).unwrap();
        assert_eq!(store.storage().bytes(), bytes.as_slice());
        assert_eq!(store.storage().commits(), 2);
    }

    #[test]
    fn test_native_layout() {
        let (config, registry) = configured();
        let mut store = ConfigStore::new(MemoryStorage::new(MAX_RECORD_SIZE));
        store.save(&config, &registry).unwrap();

        let bytes = store.storage().bytes();
        assert_eq!(bytes[0], MAGIC);
        assert_eq!(
            bytes[COUNT_OFFSET..PORT_OFFSET],
            3i32.to_ne_bytes()
        );
        assert_eq!(bytes[PORT_OFFSET..PORT_OFFSET + 4], 32300i32.to_ne_bytes());
        assert_eq!(&bytes[9..20], b"dome-relays");
        assert!(bytes[20..HEADER_SIZE].iter().all(|byte| *byte == 0));

        let location = record_size(3) - 25;
        assert_eq!(&bytes[location..location + 10], b"North pier");
    }

    #[test]
    fn test_erased_storage_bootstraps() {
        let mut store = ConfigStore::new(MemoryStorage::new(MAX_RECORD_SIZE))
            .analog_unit(AnalogUnit::DutyFraction);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.outcome, LoadOutcome::Bootstrapped);
        assert!(loaded.restart_required());
        assert_eq!(loaded.config, DeviceConfig::new());
        assert_eq!(loaded.registry.count(), DEFAULT_NUM_SWITCHES);
        assert_eq!(loaded.registry.unit(), AnalogUnit::DutyFraction);

        // The defaults were written, the next boot restores them.
        let loaded = store.load().unwrap();
        assert_eq!(loaded.outcome, LoadOutcome::Restored);
        assert_eq!(loaded.registry.count(), DEFAULT_NUM_SWITCHES);
    }

    #[test]
    fn test_corrupt_records_bootstrap() {
        let (config, registry) = configured();
        let kind_offset = HEADER_SIZE + SWITCH_RECORD_SIZE;
        let corruptions: [(usize, &[u8]); 4] = [
            (0, b"#"),
            (COUNT_OFFSET, &0i32.to_ne_bytes()),
            (COUNT_OFFSET, &9i32.to_ne_bytes()),
            (kind_offset, &7i32.to_ne_bytes()),
        ];

        for (offset, bytes) in corruptions {
            let mut store = ConfigStore::new(MemoryStorage::new(MAX_RECORD_SIZE))
                .with_pin_map(PinMap::from_ids(&[2, 14]));
            store.save(&config, &registry).unwrap();
            store.storage_mut().bytes_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);

            let loaded = store.load().unwrap();
            assert_eq!(loaded.outcome, LoadOutcome::Bootstrapped);
            assert_eq!(loaded.config, DeviceConfig::new());
            assert_eq!(loaded.registry.count(), DEFAULT_NUM_SWITCHES);
        }
    }

    #[test]
    fn test_invalid_switches_bootstrap() {
        let (config, registry) = configured();
        let relay = HEADER_SIZE;
        let pwm = HEADER_SIZE + SWITCH_RECORD_SIZE;
        // Fields of a switch record: kind 0, pin 4, min 9, max 13, value 21.
        let corruptions: [(usize, [u8; 4]); 6] = [
            // A relay driven through a pin.
            (relay + 4, 14i32.to_ne_bytes()),
            // A relay range above the binary bound.
            (relay + 9, 900.0f32.to_ne_bytes()),
            // A minimum above the maximum.
            (pwm + 9, 801.0f32.to_ne_bytes()),
            // A value outside the range.
            (pwm + 21, 1000.0f32.to_ne_bytes()),
            // A pin the board does not expose.
            (pwm + 4, 5i32.to_ne_bytes()),
            // A relay value which is neither open nor closed.
            (relay + 21, 0.5f32.to_ne_bytes()),
        ];

        for (offset, bytes) in corruptions {
            let mut store = ConfigStore::new(MemoryStorage::new(MAX_RECORD_SIZE))
                .with_pin_map(PinMap::from_ids(&[2, 14]));
            store.save(&config, &registry).unwrap();
            store.storage_mut().bytes_mut()[offset..offset + 4].copy_from_slice(&bytes);

            let loaded = store.load().unwrap();
            assert_eq!(loaded.outcome, LoadOutcome::Bootstrapped);
            assert_eq!(loaded.registry.count(), DEFAULT_NUM_SWITCHES);
        }
    }

    #[test]
    fn test_shared_pin_bootstraps() {
        let (config, mut registry) = configured();
        let mut output = RecordingOutput::default();
        registry
            .set_kind(
                2,
                KindSettings::analog(SwitchKind::Dac, Pin::new(2), 0.0, 1024.0, 1.0),
                &mut output,
            )
            .unwrap();
        let mut store = ConfigStore::new(MemoryStorage::new(MAX_RECORD_SIZE))
            .with_pin_map(PinMap::from_ids(&[2, 14]));
        store.save(&config, &registry).unwrap();
        assert_eq!(store.load().unwrap().outcome, LoadOutcome::Restored);

        // Both analog switches now claim pin 14.
        let pin = HEADER_SIZE + 2 * SWITCH_RECORD_SIZE + 4;
        store.storage_mut().bytes_mut()[pin..pin + 4].copy_from_slice(&14i32.to_ne_bytes());
        assert_eq!(store.load().unwrap().outcome, LoadOutcome::Bootstrapped);
    }

    #[test]
    fn test_count_beyond_storage_is_corrupt() {
        let (config, mut registry) = configured();
        registry.resize(2).unwrap();
        let mut store = ConfigStore::new(MemoryStorage::new(record_size(2)))
            .with_pin_map(PinMap::from_ids(&[2, 14]));
        store.save(&config, &registry).unwrap();
        assert_eq!(store.load().unwrap().outcome, LoadOutcome::Restored);

        store.storage_mut().bytes_mut()[COUNT_OFFSET..PORT_OFFSET]
            .copy_from_slice(&3i32.to_ne_bytes());
        assert!(matches!(store.restore(), Err(Error::StorageCorrupt(_))));
        // The defaults do not fit either.
        assert!(matches!(
            store.load(),
            Err(Error::StorageFull {
                needed: MAX_RECORD_SIZE,
                ..
            })
        ));
    }

    #[test]
    fn test_text_truncated_on_char_boundary() {
        // The last kept byte would split the two bytes of `é`.
        let mut encoder = super::Encoder(alloc::vec::Vec::new());
        encoder.text("Ventola cupola nord-esté");
        assert_eq!(encoder.0.len(), 25);
        assert_eq!(&encoder.0[..23], b"Ventola cupola nord-est");
        assert!(encoder.0[23..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn test_magic_written_last() {
        let (config, registry) = configured();
        let mut store = ConfigStore::new(JournalStorage::new(MAX_RECORD_SIZE));
        store.save(&config, &registry).unwrap();

        assert_eq!(
            store.storage().journal,
            [
                Operation::Write {
                    offset: COUNT_OFFSET,
                    len: record_size(3) - 1
                },
                Operation::Write { offset: 0, len: 1 },
                Operation::Commit
            ]
        );
    }

    #[test]
    fn test_interrupted_first_save() {
        let (config, registry) = configured();
        let mut storage = JournalStorage::new(MAX_RECORD_SIZE);
        storage.writes_before_failure = Some(1);
        let mut store = ConfigStore::new(storage);

        assert!(matches!(
            store.save(&config, &registry),
            Err(Error::StorageIo(_))
        ));

        // Without the magic byte the payload is ignored.
        store.storage_mut().writes_before_failure = None;
        let loaded = store.load().unwrap();
        assert_eq!(loaded.outcome, LoadOutcome::Bootstrapped);
        assert_eq!(loaded.config, DeviceConfig::new());
    }

    #[test]
    fn test_storage_full() {
        let (config, registry) = configured();
        let mut store = ConfigStore::new(MemoryStorage::new(record_size(2)));

        assert_eq!(
            store.save(&config, &registry),
            Err(Error::StorageFull {
                needed: record_size(3),
                capacity: record_size(2)
            })
        );
        assert_eq!(store.storage().commits(), 0);
        assert!(
            store
                .storage()
                .bytes()
                .iter()
                .all(|byte| *byte == MemoryStorage::ERASED)
        );
    }

    #[test]
    fn test_tiny_storage_fails_to_boot() {
        let mut store = ConfigStore::new(MemoryStorage::new(16));
        assert!(matches!(store.load(), Err(Error::StorageFull { .. })));
    }

    #[test]
    fn test_read_failure_propagates() {
        let mut storage = MemoryStorage::new(MAX_RECORD_SIZE);
        let mut buffer = [0; 8];
        assert!(matches!(
            super::Storage::read_bytes(&mut storage, MAX_RECORD_SIZE - 4, &mut buffer),
            Err(Error::StorageIo(_))
        ));
    }
}
