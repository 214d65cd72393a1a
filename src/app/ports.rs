//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ EnerginoService (domain)
//! ```
//!
//! Driven adapters (ADC, relay, event sinks, storage, feed client)
//! implement these traits.  The [`EnerginoService`](super::service::EnerginoService)
//! consumes them via generics, so the domain core never touches hardware
//! directly and runs unchanged on the host under test.

use crate::error::CommsError;
use crate::protocol::feed::FeedRequest;

// ───────────────────────────────────────────────────────────────
// Analog port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Logical analog inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogChannel {
    /// Divider tap on the supply rail.
    Voltage,
    /// Hall-effect current sensor output.
    Current,
    /// Unconnected input, read only for its noise (MAC seed).
    Floating,
}

/// Read-side port: raw 10-bit samples (0..=1023).
pub trait AnalogPort {
    fn read_raw(&mut self, channel: AnalogChannel) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the single relay output.
pub trait RelayPort {
    /// Drive the relay pin high or low.  What that means for the load
    /// depends on the build's [`RelayPolarity`](crate::config::RelayPolarity).
    fn set_relay(&mut self, high: bool);

    /// Current relay pin level.
    fn relay_high(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → serial / logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (telemetry line on
/// the serial port, log output, both).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent<'_>);
}

/// Fan out to two sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent<'_>) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Feed port (driven adapter: domain → remote time-series endpoint)
// ───────────────────────────────────────────────────────────────

/// One bounded, fire-and-forget write to the remote feed.
///
/// Implementations must return within the profile's feed timeout.  The
/// response body is never inspected.
pub trait FeedPort {
    fn push(&mut self, request: &FeedRequest) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// Write operations MUST be atomic: no partial writes on power loss.
/// The ESP-IDF NVS API guarantees this natively; in-memory simulation
/// achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from event system)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a cadence comes due.
///
/// The main loop implements this by pushing into the
/// [`EventQueue`](crate::events::EventQueue); the scheduler itself knows
/// nothing about events.
pub trait SchedulerDelegate {
    fn on_due(&mut self, cadence: Cadence);
}

/// Which timer came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Raw sample acquisition.
    Sample,
    /// Report period expiry.
    Report,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from settings persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No record in storage (first boot).
    NotFound,
    /// Stored record failed to decode.
    Corrupted,
    /// Underlying storage is full, or the record does not fit.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "settings not found"),
            Self::Corrupted => write!(f, "settings corrupted"),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
