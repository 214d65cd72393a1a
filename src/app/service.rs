//! Application service: the hexagonal core.
//!
//! [`EnerginoService`] owns the settings store, the meter and the serial
//! command parser.  It exposes a hardware-agnostic API; all I/O flows
//! through port traits injected at call sites, so the whole service runs
//! against mock adapters on the host.
//!
//! ```text
//!   AnalogPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                  │     EnerginoService      │
//!    RelayPort ◀──│ Meter · Settings · Parser │ ──▶ FeedPort
//!                  └──────────────────────────┘
//! ```
//!
//! Per report period the main loop calls, in order: [`sample`] at the
//! acquisition cadence, [`receive_serial`] for each chunk read from the
//! port and [`end_serial_burst`] once it is drained, [`report`] when the
//! period expires.  [`handle_http`] runs whenever a request arrives.
//!
//! [`sample`]: EnerginoService::sample
//! [`receive_serial`]: EnerginoService::receive_serial
//! [`end_serial_burst`]: EnerginoService::end_serial_burst
//! [`report`]: EnerginoService::report
//! [`handle_http`]: EnerginoService::handle_http

use log::{debug, info, warn};

use crate::config::BuildProfile;
use crate::identity;
use crate::measure::conversion::Calibration;
use crate::measure::{Meter, Reading};
use crate::protocol::feed;
use crate::protocol::http::{self, HttpResponse, Route};
use crate::protocol::parser::{CommandParser, FrameOutcome};
use crate::settings::{Field, RawValue, Settings, SettingsStore};

use super::commands::Command;
use super::events::AppEvent;
use super::ports::{AnalogChannel, AnalogPort, EventSink, FeedPort, RelayPort, StoragePort};

/// Floating-input reads folded into one PRNG seed.
const SEED_SAMPLES: usize = 8;

// ───────────────────────────────────────────────────────────────
// EnerginoService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct EnerginoService<S: StoragePort> {
    profile: BuildProfile,
    store: SettingsStore<S>,
    meter: Meter,
    parser: CommandParser,
    /// Uptime (ms) of the previous report.
    last_report_ms: u64,
    /// Previous report, served over HTTP while a fresh epoch is empty.
    last_reading: Option<Reading>,
}

impl<S: StoragePort> EnerginoService<S> {
    /// Load settings (writing defaults on a fresh or foreign record) and
    /// build the meter for the profile's averaging policy.
    pub fn new(storage: S, profile: BuildProfile, hw: &mut impl AnalogPort) -> Self {
        let seed = noise_seed(hw);
        let store = SettingsStore::load(storage, profile, seed);
        Self {
            profile,
            store,
            meter: Meter::new(profile.averaging),
            parser: CommandParser::new(),
            last_report_ms: 0,
            last_reading: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Put the relay in its power-on state (pin low) and announce startup.
    pub fn start(&mut self, now_ms: u64, hw: &mut impl RelayPort, sink: &mut impl EventSink) {
        hw.set_relay(false);
        self.last_report_ms = now_ms;
        let settings = self.store.settings();
        let id = identity::device_id(&settings.mac);
        info!(
            "EnerginoService started: {} ({:?}), period {} ms",
            id,
            self.profile.variant,
            settings.effective_period(&self.profile)
        );
        sink.emit(&AppEvent::Started {
            device_id: id.as_str(),
            settings,
        });
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Take one raw sample from each measurement channel.
    pub fn sample(&mut self, hw: &mut impl AnalogPort) {
        let v = hw.read_raw(AnalogChannel::Voltage);
        let i = hw.read_raw(AnalogChannel::Current);
        self.meter.push(v, i);
    }

    /// Feed one complete burst and act on every command in it.
    pub fn poll_serial(
        &mut self,
        burst: &[u8],
        hw: &mut (impl AnalogPort + RelayPort),
        sink: &mut impl EventSink,
    ) {
        self.receive_serial(burst, hw, sink);
        self.end_serial_burst(hw, sink);
    }

    /// Feed one chunk of a burst that may continue.  Frames terminated by
    /// CR/LF inside the chunk are dispatched as they complete.
    pub fn receive_serial(
        &mut self,
        chunk: &[u8],
        hw: &mut (impl AnalogPort + RelayPort),
        sink: &mut impl EventSink,
    ) {
        for &b in chunk {
            if let Some(outcome) = self.parser.push_byte(b) {
                self.dispatch(outcome, hw, sink);
            }
        }
    }

    /// The serial port is drained: complete the frame in progress.
    pub fn end_serial_burst(
        &mut self,
        hw: &mut (impl AnalogPort + RelayPort),
        sink: &mut impl EventSink,
    ) {
        if let Some(outcome) = self.parser.finish_burst() {
            self.dispatch(outcome, hw, sink);
        }
    }

    fn dispatch(
        &mut self,
        outcome: FrameOutcome,
        hw: &mut (impl AnalogPort + RelayPort),
        sink: &mut impl EventSink,
    ) {
        match outcome {
            FrameOutcome::Command(cmd) => self.handle_command(cmd, hw, sink),
            FrameOutcome::Malformed(reason) => {
                debug!("Serial: frame discarded ({:?})", reason);
                sink.emit(&AppEvent::FrameRejected(reason));
            }
            FrameOutcome::Waiting | FrameOutcome::Idle => {}
        }
    }

    /// Close the report period: convert, emit, and push to the remote
    /// feed when it is enabled.  A failed push is logged and dropped.
    pub fn report(
        &mut self,
        now_ms: u64,
        hw: &impl RelayPort,
        feed_port: &mut impl FeedPort,
        sink: &mut impl EventSink,
    ) -> Reading {
        let elapsed = now_ms.saturating_sub(self.last_report_ms);
        self.last_report_ms = now_ms;

        let settings = self.store.settings();
        let cal = Calibration::new(settings, self.profile.aref_mv);
        let reading = self.meter.finish_period(&cal, hw.relay_high(), elapsed);
        sink.emit(&AppEvent::Report {
            reading: &reading,
            settings,
        });

        if settings.remote_enabled(&self.profile) {
            let pushed = feed::build_request(&reading, settings, &self.profile)
                .and_then(|req| feed_port.push(&req));
            match pushed {
                Ok(()) => debug!("Feed: pushed {} to feed {}", reading.power, settings.feedid),
                Err(e) => {
                    warn!("Feed: push failed ({}), dropped", e);
                    sink.emit(&AppEvent::FeedPushFailed(e));
                }
            }
        }

        self.last_reading = Some(reading);
        reading
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one command from the serial port.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        hw: &mut (impl AnalogPort + RelayPort),
        sink: &mut impl EventSink,
    ) {
        match cmd {
            Command::Set(field, raw) => match self.store.update(field, &raw) {
                Ok(value) => sink.emit(&AppEvent::SettingChanged(&value)),
                Err(reason) => {
                    debug!("Settings: {:?} rejected ({})", field, reason);
                    sink.emit(&AppEvent::ValueRejected(reason));
                }
            },
            Command::SetRelay(high) => {
                hw.set_relay(high);
                sink.emit(&AppEvent::RelaySwitched(high));
            }
            Command::Reset => {
                let seed = noise_seed(hw);
                self.store.reset_to_defaults(seed);
                info!("Settings: reset to defaults");
                sink.emit(&AppEvent::SettingsReset);
            }
            Command::CalibrateOffset => {
                let offset = self.measure_offset(hw);
                match self.store.update(Field::Offset, &RawValue::Int(i64::from(offset))) {
                    Ok(_) => {
                        info!("Settings: offset calibrated to {} mV", offset);
                        sink.emit(&AppEvent::OffsetCalibrated(offset));
                    }
                    Err(reason) => sink.emit(&AppEvent::ValueRejected(reason)),
                }
            }
            Command::DumpSettings => sink.emit(&AppEvent::SettingsDump(self.store.settings())),
        }
    }

    /// Serve one HTTP request.  `switch/<0|1>` drives the relay before the
    /// response is rendered, so the body reflects the new level.
    pub fn handle_http(
        &mut self,
        method: &str,
        path: &str,
        hw: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) -> HttpResponse {
        let route = match http::route(method, path, self.profile.http_namespace) {
            Ok(route) => route,
            Err(status) => {
                debug!("HTTP: {} {} -> {:?}", method, path, status);
                return HttpResponse::error(status);
            }
        };
        if let Route::SetSwitch(high) = route {
            hw.set_relay(high);
            sink.emit(&AppEvent::RelaySwitched(high));
        }
        let reading = self.current_reading(hw.relay_high());
        HttpResponse::ok(http::render_body(route, &reading))
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn profile(&self) -> &BuildProfile {
        &self.profile
    }

    pub fn store(&self) -> &SettingsStore<S> {
        &self.store
    }

    /// Report period currently in force (ms).
    pub fn report_period_ms(&self) -> u32 {
        self.store.settings().effective_period(&self.profile)
    }

    pub fn calibration(&self) -> Calibration {
        Calibration::new(self.store.settings(), self.profile.aref_mv)
    }

    /// Whether the load is powered, per the relay wiring convention.
    pub fn load_on(&self, hw: &impl RelayPort) -> bool {
        self.profile.relay_polarity.load_on(hw.relay_high())
    }

    /// Live values for on-demand queries.  With epoch averaging the
    /// running average is empty right after a report; fall back to that
    /// report.
    pub fn current_reading(&self, relay_high: bool) -> Reading {
        let live = self.meter.peek(&self.calibration(), relay_high);
        match self.last_reading {
            Some(last) if live.samples == 0 => Reading { relay_high, ..last },
            _ => live,
        }
    }

    // ── Internals ─────────────────────────────────────────────

    /// Average `calibration_samples` raw current reads into millivolts.
    /// Assumes no load is connected.
    fn measure_offset(&self, hw: &mut impl AnalogPort) -> i32 {
        let n = self.profile.calibration_samples.max(1);
        let sum: u64 = (0..n)
            .map(|_| u64::from(hw.read_raw(AnalogChannel::Current)))
            .sum();
        let raw_avg = sum as f64 / f64::from(n);
        self.calibration().raw_to_mv(raw_avg).round() as i32
    }
}

fn noise_seed(hw: &mut impl AnalogPort) -> u64 {
    identity::seed_from_noise((0..SEED_SAMPLES).map(|_| hw.read_raw(AnalogChannel::Floating)))
}
