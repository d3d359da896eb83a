use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use alpaca_switch::error::{Error, Result};
use alpaca_switch::store::{MAX_RECORD_SIZE, MemoryStorage, Storage};

use tracing::{debug, warn};

fn io_error(context: &str, path: &Path, error: &std::io::Error) -> Error {
    Error::StorageIo(format!("{context} `{}`: {error}", path.display()))
}

/// A [`Storage`] emulating an `EEPROM` inside a file.
///
/// Like the `EEPROM` emulation of many microcontrollers, reads and writes
/// operate on a memory copy, which [`Storage::commit`] replaces atomically
/// on disk.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    memory: MemoryStorage,
}

impl FileStorage {
    /// Opens the file at `path` with the capacity of the largest record.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::StorageIo`] when the file exists but cannot be
    /// read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_capacity(path, MAX_RECORD_SIZE)
    }

    /// Opens the file at `path` with a capacity of `capacity` bytes.
    ///
    /// A missing file is treated as an erased memory. A file longer than
    /// `capacity` is truncated to it.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::StorageIo`] when the file exists but cannot be
    /// read.
    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let path = path.into();
        let mut memory = MemoryStorage::new(capacity);

        match fs::read(&path) {
            Ok(bytes) => {
                if bytes.len() > capacity {
                    warn!(
                        "`{}` holds {} bytes, only the first {capacity} are used",
                        path.display(),
                        bytes.len()
                    );
                }
                let len = bytes.len().min(capacity);
                memory.bytes_mut()[..len].copy_from_slice(&bytes[..len]);
                debug!("Loaded {len} bytes from `{}`", path.display());
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("`{}` not found, starting erased", path.display());
            }
            Err(error) => return Err(io_error("unable to read", &path, &error)),
        }

        Ok(Self { path, memory })
    }

    /// Returns the path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self) -> std::io::Result<()> {
        let temporary = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temporary)?;
            file.write_all(self.memory.bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temporary, &self.path)
    }
}

impl Storage for FileStorage {
    fn read_bytes(&mut self, offset: usize, buffer: &mut [u8]) -> Result<()> {
        self.memory.read_bytes(offset, buffer)
    }

    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.memory.write_bytes(offset, bytes)
    }

    fn commit(&mut self) -> Result<()> {
        self.write_file()
            .map_err(|error| io_error("unable to write", &self.path, &error))?;
        self.memory.commit()
    }

    fn capacity(&self) -> usize {
        self.memory.capacity()
    }
}
