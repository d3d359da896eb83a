//! `alpaca-switch-os` runs an ASCOM Alpaca switch device on an operating
//! system.
//!
//! This crate provides APIs to:
//!
//! - Persist the device configuration inside a file which emulates the
//!   `EEPROM` of a microcontroller.
//! - Boot a device, retrying for a bounded number of times when its storage
//!   cannot be accessed.
//! - Share a device among concurrent request handlers, applying one request
//!   at a time.
//!
//! The HTTP surface is left to the application: every handler only needs to
//! collect its request parameters and call the matching [`SharedDevice`]
//! method.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// A file-backed configuration storage.
pub mod file_storage;
/// A device shared among request handlers.
pub mod shared;

pub use file_storage::FileStorage;
pub use shared::{RetryPolicy, SharedDevice, boot};
