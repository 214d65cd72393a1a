//! Unified error types for the Energino firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! `main`'s bring-up error handling uniform.  All variants are `Copy`.
//!
//! Once the loop is running nothing escapes it: each error is logged and
//! absorbed where it is detected (see the adapters).

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};
use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Peripheral initialisation failed.
    Init(HwInitError),
    /// The storage backend could not be opened.
    Storage(StorageError),
    /// Settings could not be loaded or persisted.
    Config(ConfigError),
    /// Serial, HTTP or remote feed I/O failed.
    Comms(CommsError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Endpoint host name did not resolve.
    AddressUnresolved,
    /// TCP connect refused or unreachable.
    ConnectFailed,
    /// Connect or write exceeded the configured bound.
    Timeout,
    /// Connection dropped mid-write.
    WriteFailed,
    /// Listener could not be bound.
    BindFailed,
    /// Request did not fit the fixed-size buffer.
    Overflow,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressUnresolved => write!(f, "address unresolved"),
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::Timeout => write!(f, "timed out"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::BindFailed => write!(f, "bind failed"),
            Self::Overflow => write!(f, "buffer overflow"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
