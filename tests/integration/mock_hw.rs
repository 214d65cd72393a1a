//! Mock adapters for integration tests.
//!
//! Records every relay write, event and feed push so tests can assert on
//! the full history without touching real ADC/GPIO registers or sockets.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use energino::app::events::AppEvent;
use energino::app::ports::{
    AnalogChannel, AnalogPort, EventSink, FeedPort, RelayPort, StorageError, StoragePort,
};
use energino::error::CommsError;
use energino::measure::Reading;
use energino::protocol::feed::FeedRequest;
use energino::protocol::parser::Malformed;
use energino::settings::{FieldValue, Rejected};

// ── MockHardware ──────────────────────────────────────────────

/// Fixed raw ADC values plus a relay that records every write.
pub struct MockHardware {
    pub voltage_raw: u16,
    pub current_raw: u16,
    pub floating_raw: u16,
    pub relay: bool,
    pub relay_writes: Vec<bool>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            voltage_raw: 0,
            current_raw: 0,
            floating_raw: 0x155,
            relay: false,
            relay_writes: Vec::new(),
        }
    }

    pub fn with_raw(voltage_raw: u16, current_raw: u16) -> Self {
        Self {
            voltage_raw,
            current_raw,
            ..Self::new()
        }
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogPort for MockHardware {
    fn read_raw(&mut self, channel: AnalogChannel) -> u16 {
        match channel {
            AnalogChannel::Voltage => self.voltage_raw,
            AnalogChannel::Current => self.current_raw,
            AnalogChannel::Floating => self.floating_raw,
        }
    }
}

impl RelayPort for MockHardware {
    fn set_relay(&mut self, high: bool) {
        self.relay = high;
        self.relay_writes.push(high);
    }

    fn relay_high(&self) -> bool {
        self.relay
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Owned copy of an [`AppEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Started,
    Report(Reading),
    SettingChanged(FieldValue),
    SettingsDump,
    SettingsReset,
    RelaySwitched(bool),
    OffsetCalibrated(i32),
    FrameRejected(Malformed),
    ValueRejected(Rejected),
    FeedPushFailed(CommsError),
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<Recorded>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&Recorded> {
        self.events.last()
    }

    pub fn take(&mut self) -> Vec<Recorded> {
        std::mem::take(&mut self.events)
    }

    pub fn reports(&self) -> Vec<Reading> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Recorded::Report(r) => Some(*r),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent<'_>) {
        let owned = match *event {
            AppEvent::Started { .. } => Recorded::Started,
            AppEvent::Report { reading, .. } => Recorded::Report(*reading),
            AppEvent::SettingChanged(v) => Recorded::SettingChanged(v.clone()),
            AppEvent::SettingsDump(_) => Recorded::SettingsDump,
            AppEvent::SettingsReset => Recorded::SettingsReset,
            AppEvent::RelaySwitched(high) => Recorded::RelaySwitched(high),
            AppEvent::OffsetCalibrated(mv) => Recorded::OffsetCalibrated(mv),
            AppEvent::FrameRejected(m) => Recorded::FrameRejected(m),
            AppEvent::ValueRejected(r) => Recorded::ValueRejected(r),
            AppEvent::FeedPushFailed(e) => Recorded::FeedPushFailed(e),
        };
        self.events.push(owned);
    }
}

// ── MockFeed ──────────────────────────────────────────────────

/// Captures rendered push requests; optionally fails every push.
#[derive(Default)]
pub struct MockFeed {
    pub pushed: Vec<String>,
    pub fail_with: Option<CommsError>,
}

impl FeedPort for MockFeed {
    fn push(&mut self, request: &FeedRequest) -> Result<(), CommsError> {
        if let Some(e) = self.fail_with {
            return Err(e);
        }
        self.pushed.push(request.request.as_str().to_string());
        Ok(())
    }
}

// ── SharedStorage ─────────────────────────────────────────────

/// In-memory storage whose clones share one backing map, so a test can
/// "reboot" by building a new service over a clone.
#[derive(Clone, Default)]
pub struct SharedStorage {
    inner: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    pub writes: Rc<RefCell<usize>>,
}

#[allow(dead_code)]
impl SharedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }

    /// Overwrite a raw blob, bypassing the settings layer.
    pub fn poke(&self, namespace: &str, key: &str, data: &[u8]) {
        self.inner
            .borrow_mut()
            .insert(format!("{namespace}::{key}"), data.to_vec());
    }

    pub fn peek(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.inner.borrow().get(&format!("{namespace}::{key}")).cloned()
    }
}

impl StoragePort for SharedStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.inner.borrow().get(&format!("{namespace}::{key}")) {
            Some(data) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        *self.writes.borrow_mut() += 1;
        self.poke(namespace, key, data);
        Ok(())
    }
}
