//! Outbound application events.
//!
//! The [`EnerginoService`](super::service::EnerginoService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: render the telemetry line
//! on the serial port, log them, or both.
//!
//! Events borrow from the service's state; sinks that need to keep
//! anything must copy it.

use crate::error::CommsError;
use crate::measure::Reading;
use crate::protocol::parser::Malformed;
use crate::settings::{FieldValue, Rejected, Settings};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy)]
pub enum AppEvent<'a> {
    /// The service has loaded its settings and is about to start sampling.
    Started {
        device_id: &'a str,
        settings: &'a Settings,
    },

    /// One report period closed.
    Report {
        reading: &'a Reading,
        settings: &'a Settings,
    },

    /// A settings field was updated (and persisted).
    SettingChanged(&'a FieldValue),

    /// `#Z` asked for a settings dump.
    SettingsDump(&'a Settings),

    /// Settings were restored to defaults.
    SettingsReset,

    /// The relay pin was driven (`true` = high).
    RelaySwitched(bool),

    /// Current-sensor offset was re-measured (mV).
    OffsetCalibrated(i32),

    /// A serial frame was discarded.
    FrameRejected(Malformed),

    /// A well-formed command carried an unacceptable value.
    ValueRejected(Rejected),

    /// The remote feed push failed; dropped until the next period.
    FeedPushFailed(CommsError),
}
