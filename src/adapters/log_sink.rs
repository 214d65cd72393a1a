//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger.  Runs alongside the serial sink: the serial line
//! is the collector-facing record, this is the operator-facing trace.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent<'_>) {
        match event {
            AppEvent::Started { device_id, settings } => {
                info!(
                    "START | {} | magic={} rev={} period={}ms feed={}",
                    device_id, settings.magic, settings.revision, settings.period, settings.feedid
                );
            }
            AppEvent::Report { reading, .. } => {
                debug!(
                    "REPORT | V={:.3} I={:.3} P={:.2} | relay={} | n={} over {}ms",
                    reading.voltage,
                    reading.current,
                    reading.power,
                    if reading.relay_high { "high" } else { "low" },
                    reading.samples,
                    reading.elapsed_ms,
                );
            }
            AppEvent::SettingChanged(value) => info!("SET | {:?}", value),
            AppEvent::SettingsDump(_) => debug!("DUMP | settings requested"),
            AppEvent::SettingsReset => info!("SET | reset to defaults"),
            AppEvent::RelaySwitched(high) => {
                info!("RELAY | {}", if *high { "high" } else { "low" });
            }
            AppEvent::OffsetCalibrated(mv) => info!("CAL | offset={}mV", mv),
            AppEvent::FrameRejected(reason) => debug!("CMD | frame rejected: {:?}", reason),
            AppEvent::ValueRejected(reason) => debug!("CMD | value rejected: {}", reason),
            AppEvent::FeedPushFailed(e) => warn!("FEED | push failed: {}", e),
        }
    }
}
