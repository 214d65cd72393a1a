//! Inbound commands to the application service.
//!
//! Produced by the serial [`CommandParser`](crate::protocol::parser::CommandParser)
//! and by the HTTP router, interpreted by the
//! [`EnerginoService`](super::service::EnerginoService).

use crate::settings::{Field, RawValue};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validate, store and persist one settings field.
    Set(Field, RawValue),

    /// Drive the relay pin (`true` = high).
    SetRelay(bool),

    /// Restore compiled-in settings defaults.
    Reset,

    /// Re-measure the current sensor's zero offset.  The load must be
    /// disconnected while this runs; nothing checks that.
    CalibrateOffset,

    /// Print every settings field.
    DumpSettings,
}
