use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::kind::SwitchKind;
use crate::output::SwitchOutput;
use crate::pin::Pin;
use crate::store::{MemoryStorage, Storage};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Write {
    Digital {
        index: usize,
        pin: Pin,
        energized: bool,
    },
    Analog {
        index: usize,
        pin: Pin,
        level: f32,
    },
    Configure {
        index: usize,
        kind: SwitchKind,
        pin: Pin,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OutputError;

// Records every write, failing all of them when `fail` is set.
#[derive(Debug, Default)]
pub(crate) struct RecordingOutput {
    pub(crate) writes: Vec<Write>,
    pub(crate) fail: bool,
}

impl RecordingOutput {
    pub(crate) fn failing() -> Self {
        Self {
            writes: Vec::new(),
            fail: true,
        }
    }

    fn record(&mut self, write: Write) -> core::result::Result<(), OutputError> {
        if self.fail {
            return Err(OutputError);
        }
        self.writes.push(write);
        Ok(())
    }
}

impl SwitchOutput for RecordingOutput {
    type Error = OutputError;

    fn write_digital(
        &mut self,
        index: usize,
        pin: Pin,
        energized: bool,
    ) -> core::result::Result<(), Self::Error> {
        self.record(Write::Digital {
            index,
            pin,
            energized,
        })
    }

    fn write_analog(
        &mut self,
        index: usize,
        pin: Pin,
        level: f32,
    ) -> core::result::Result<(), Self::Error> {
        self.record(Write::Analog { index, pin, level })
    }

    fn configure(
        &mut self,
        index: usize,
        kind: SwitchKind,
        pin: Pin,
    ) -> core::result::Result<(), Self::Error> {
        self.record(Write::Configure { index, kind, pin })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Write { offset: usize, len: usize },
    Commit,
}

// A memory storage which journals every operation and can simulate a power
// loss after a number of writes.
#[derive(Debug)]
pub(crate) struct JournalStorage {
    pub(crate) memory: MemoryStorage,
    pub(crate) journal: Vec<Operation>,
    pub(crate) writes_before_failure: Option<usize>,
}

impl JournalStorage {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            memory: MemoryStorage::new(capacity),
            journal: Vec::new(),
            writes_before_failure: None,
        }
    }
}

impl Storage for JournalStorage {
    fn read_bytes(&mut self, offset: usize, buffer: &mut [u8]) -> Result<()> {
        self.memory.read_bytes(offset, buffer)
    }

    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        if let Some(remaining) = self.writes_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(Error::StorageIo("power lost".into()));
            }
            *remaining -= 1;
        }
        self.journal.push(Operation::Write {
            offset,
            len: bytes.len(),
        });
        self.memory.write_bytes(offset, bytes)
    }

    fn commit(&mut self) -> Result<()> {
        self.journal.push(Operation::Commit);
        self.memory.commit()
    }

    fn capacity(&self) -> usize {
        self.memory.capacity()
    }
}
