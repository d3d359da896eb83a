use alloc::string::String;

use crate::kind::SwitchKind;
use crate::pin::Pin;
use crate::setup::SetupField;

/// A specialized [`Result`](core::result::Result) for switch operations.
pub type Result<T> = core::result::Result<T, Error>;

/// All errors that may occur while operating on the switches and their
/// persisted configuration.
///
/// Every variant, except the storage ones, is recoverable and meant to be
/// converted into an [`ErrorResponse`](crate::response::ErrorResponse) at
/// the request handler boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The switch index is outside `[0, count)`, or an analog value is
    /// outside the `[min, max]` range of the switch.
    #[error("switch {index} is out of range: {exceeded}")]
    OutOfRange {
        /// Switch index.
        index: usize,
        /// The exceeded bound.
        exceeded: Exceeded,
    },
    /// A resize was requested with a switch count outside `[1, MAX_SWITCH]`.
    #[error("invalid switch count {count}, it must be in [1, {max}]")]
    InvalidCount {
        /// Requested count.
        count: usize,
        /// Maximum number of switches.
        max: usize,
    },
    /// The switch does not accept value changes from clients.
    #[error("switch {index} is not writeable")]
    NotWriteable {
        /// Switch index.
        index: usize,
    },
    /// The operation does not apply to the kind of the switch.
    #[error("operation not valid for switch {index} of kind {kind}")]
    WrongKind {
        /// Switch index.
        index: usize,
        /// Current switch kind.
        kind: SwitchKind,
    },
    /// A name or description does not fit in the persisted fixed-width field.
    #[error("{field} is {length} bytes long, it must be shorter than {max} bytes")]
    NameTooLong {
        /// Offending field.
        field: SetupField,
        /// Length in bytes of the rejected text.
        length: usize,
        /// Maximum length in bytes, exclusive.
        max: usize,
    },
    /// A text contains a character which cannot be persisted.
    #[error("{field} contains a NUL character")]
    InvalidCharacter {
        /// Offending field.
        field: SetupField,
    },
    /// A setup submission does not contain a valid set of fields.
    #[error("incomplete setup submission, missing {missing}")]
    IncompleteSubmission {
        /// The first missing field.
        missing: SetupField,
    },
    /// The switch kind is unknown or not operable.
    #[error("invalid switch kind `{value}`")]
    InvalidKind {
        /// Rejected kind value as submitted.
        value: String,
    },
    /// The pin is already assigned to another analog switch.
    #[error("pin {pin} is already assigned to switch {owner}")]
    PinInUse {
        /// Requested pin.
        pin: Pin,
        /// Index of the switch owning the pin.
        owner: usize,
    },
    /// The pin is not part of the device pin map.
    #[error("pin {pin} is not available on this device")]
    PinOutOfRange {
        /// Requested pin.
        pin: Pin,
    },
    /// A relay switch was configured with a non-null pin.
    #[error("pin {pin} is not allowed for a {kind} switch")]
    UnexpectedPin {
        /// Requested pin.
        pin: Pin,
        /// Requested kind.
        kind: SwitchKind,
    },
    /// A range descriptor is outside the bounds allowed for the switch kind.
    #[error("{field} is outside the [0, {max}] range allowed for the switch kind")]
    ValueOutOfRange {
        /// Offending field.
        field: SetupField,
        /// Upper bound allowed for the kind.
        max: f32,
    },
    /// The minimum is greater than the maximum.
    #[error("minimum {min} is greater than maximum {max}")]
    InvalidRange {
        /// Requested minimum.
        min: f32,
        /// Requested maximum.
        max: f32,
    },
    /// The hostname is empty, too long, or contains invalid characters.
    #[error("invalid hostname `{hostname}`")]
    InvalidHostname {
        /// Rejected hostname.
        hostname: String,
    },
    /// The discovery port is outside `(1024, 65535)`.
    #[error("invalid discovery port {port}, it must be in (1024, 65535)")]
    InvalidPort {
        /// Rejected port.
        port: i64,
    },
    /// The hardware output failed.
    #[error("output of switch {index} failed: {reason}")]
    OutputFailure {
        /// Switch index.
        index: usize,
        /// Failure reported by the output.
        reason: String,
    },
    /// The persisted record is not valid.
    ///
    /// This error never reaches the callers of
    /// [`ConfigStore::load`](crate::store::ConfigStore::load), which
    /// bootstraps the defaults instead.
    #[error("persisted configuration is corrupt: {0}")]
    StorageCorrupt(&'static str),
    /// Reading from or writing to the storage failed.
    #[error("storage i/o failure: {0}")]
    StorageIo(String),
    /// The record does not fit in the storage.
    #[error("configuration needs {needed} bytes, the storage holds {capacity}")]
    StorageFull {
        /// Record size in bytes.
        needed: usize,
        /// Storage capacity in bytes.
        capacity: usize,
    },
}

impl Error {
    pub(crate) const fn index_out_of_range(index: usize, count: usize) -> Self {
        Self::OutOfRange {
            index,
            exceeded: Exceeded::SwitchCount(count),
        }
    }

    /// Whether the error originates from the storage medium.
    ///
    /// Storage errors are fatal at boot, all the others are reported to the
    /// client which sent the request.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::StorageCorrupt(_) | Self::StorageIo(_) | Self::StorageFull { .. }
        )
    }

    /// Returns the index of the switch the error refers to, if any.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        match self {
            Self::OutOfRange { index, .. }
            | Self::NotWriteable { index }
            | Self::WrongKind { index, .. }
            | Self::OutputFailure { index, .. } => Some(*index),
            Self::PinInUse { owner, .. } => Some(*owner),
            _ => None,
        }
    }

    /// Returns the setup field the error refers to, if any.
    #[must_use]
    pub const fn field(&self) -> Option<SetupField> {
        match self {
            Self::NameTooLong { field, .. }
            | Self::InvalidCharacter { field }
            | Self::ValueOutOfRange { field, .. } => Some(*field),
            Self::IncompleteSubmission { missing } => Some(*missing),
            Self::InvalidKind { .. } => Some(SetupField::Kind),
            Self::PinInUse { .. } | Self::PinOutOfRange { .. } | Self::UnexpectedPin { .. } => {
                Some(SetupField::Pin)
            }
            Self::InvalidRange { .. } => Some(SetupField::Min),
            Self::InvalidHostname { .. } => Some(SetupField::Hostname),
            _ => None,
        }
    }
}

/// The bound exceeded by an [`Error::OutOfRange`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exceeded {
    /// The index is not below the number of switches.
    SwitchCount(usize),
    /// The analog value is outside the switch range.
    ValueRange {
        /// Rejected value.
        value: f32,
        /// Switch minimum.
        min: f32,
        /// Switch maximum.
        max: f32,
    },
}

impl core::fmt::Display for Exceeded {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SwitchCount(count) => write!(f, "the device has {count} switches"),
            Self::ValueRange { value, min, max } => {
                write!(f, "value {value} is outside [{min}, {max}]")
            }
        }
    }
}
