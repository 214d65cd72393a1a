//! Serial console adapter.
//!
//! [`SerialEventSink`] turns [`AppEvent`]s into the line protocol from
//! [`protocol::telemetry`](crate::protocol::telemetry) and writes them to
//! any [`Transport`].  [`serve_serial`] drains the command bytes that
//! arrived since the last poll into the service.
//!
//! Transports:
//! - **`target_os = "espidf"`**: [`UartTransport`], raw `uart_*` calls on
//!   the console UART configured by `hw_init`.
//! - **host**: [`SimSerial`], an in-memory loopback for tests.

use core::fmt::Write;

use heapless::String;
use log::warn;

use crate::app::events::AppEvent;
use crate::app::ports::{AnalogPort, EventSink, RelayPort, StoragePort};
use crate::app::service::EnerginoService;
use crate::config::BuildProfile;
use crate::protocol::telemetry::{self, LINE_CAP};
use crate::protocol::transport::{Transport, write_all};

/// Room for a full settings dump.
const DUMP_CAP: usize = 768;

/// Event sink that writes the serial line protocol.
pub struct SerialEventSink<T: Transport> {
    transport: T,
    profile: BuildProfile,
}

impl<T: Transport> SerialEventSink<T> {
    pub fn new(transport: T, profile: BuildProfile) -> Self {
        Self { transport, profile }
    }

    /// Drain pending input into `buf` without blocking.  Returns the
    /// number of bytes read; a transport error reads as nothing.
    pub fn read_burst(&mut self, buf: &mut [u8]) -> usize {
        if !self.transport.available() {
            return 0;
        }
        let mut filled = 0;
        while filled < buf.len() {
            match self.transport.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => {
                    warn!("Serial: read failed ({:?})", e);
                    break;
                }
            }
        }
        filled
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn send<const N: usize>(&mut self, render: impl FnOnce(&mut String<N>) -> core::fmt::Result) {
        let mut line: String<N> = String::new();
        if render(&mut line).is_err() {
            // Keep what fit; the collector still needs the terminator.
            warn!("Serial: line overflow, truncated at {} bytes", line.len());
            if line.push('\n').is_err() {
                line.pop();
                let _ = line.push('\n');
            }
        }
        if let Err(e) = write_all(&mut self.transport, line.as_bytes()) {
            warn!("Serial: write failed ({:?})", e);
            return;
        }
        let _ = self.transport.flush();
    }
}

impl<T: Transport> EventSink for SerialEventSink<T> {
    fn emit(&mut self, event: &AppEvent<'_>) {
        let profile = self.profile;
        match *event {
            AppEvent::Report { reading, settings } => self.send::<LINE_CAP>(|w| {
                telemetry::write_report(w, reading, settings, &profile)
            }),
            AppEvent::SettingChanged(value) => {
                self.send::<LINE_CAP>(|w| telemetry::write_echo(w, value));
            }
            AppEvent::SettingsDump(settings) => {
                self.send::<DUMP_CAP>(|w| telemetry::write_dump(w, settings, &profile));
            }
            AppEvent::SettingsReset => self.send::<LINE_CAP>(|w| telemetry::write_reset(w)),
            AppEvent::RelaySwitched(high) => {
                self.send::<LINE_CAP>(|w| telemetry::write_switch(w, high));
            }
            AppEvent::OffsetCalibrated(mv) => {
                self.send::<LINE_CAP>(|w| telemetry::write_offset(w, mv));
            }
            AppEvent::Started { device_id, .. } => {
                self.send::<LINE_CAP>(|w| writeln!(w, "@start: {}", device_id));
            }
            // Rejections and feed failures go to the log only; the
            // collector sees no line for them.
            AppEvent::FrameRejected(_)
            | AppEvent::ValueRejected(_)
            | AppEvent::FeedPushFailed(_) => {}
        }
    }
}

/// Drain the serial port into `service` one `rx`-sized chunk at a time,
/// then close the burst.  A chunk boundary never ends a frame; only an
/// empty port does.  Returns the number of bytes consumed.
pub fn serve_serial<T, L, S, H>(
    service: &mut EnerginoService<S>,
    sinks: &mut (SerialEventSink<T>, L),
    hw: &mut H,
    rx: &mut [u8],
) -> usize
where
    T: Transport,
    L: EventSink,
    S: StoragePort,
    H: AnalogPort + RelayPort,
{
    let mut total = 0;
    loop {
        let n = sinks.0.read_burst(rx);
        if n == 0 {
            break;
        }
        total += n;
        service.receive_serial(&rx[..n], hw, sinks);
    }
    if total > 0 {
        service.end_serial_burst(hw, sinks);
    }
    total
}

// ───────────────────────────────────────────────────────────────
// UART transport (ESP-IDF)
// ───────────────────────────────────────────────────────────────

/// The console UART, installed by `hw_init::init_peripherals`.
#[cfg(target_os = "espidf")]
pub struct UartTransport {
    port: i32,
}

#[cfg(target_os = "espidf")]
impl UartTransport {
    pub fn new(port: i32) -> Self {
        Self { port }
    }
}

/// UART driver returned a negative length.
#[cfg(target_os = "espidf")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartError(pub i32);

#[cfg(target_os = "espidf")]
impl Transport for UartTransport {
    type Error = UartError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, UartError> {
        // SAFETY: driver installed at boot; zero-tick timeout never blocks.
        let n = unsafe {
            esp_idf_svc::sys::uart_read_bytes(
                self.port,
                buf.as_mut_ptr() as *mut _,
                buf.len() as u32,
                0,
            )
        };
        if n < 0 {
            return Err(UartError(n));
        }
        Ok(n as usize)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, UartError> {
        // SAFETY: driver installed at boot; copies into the TX ring buffer.
        let n = unsafe {
            esp_idf_svc::sys::uart_write_bytes(self.port, data.as_ptr() as *const _, data.len())
        };
        if n < 0 {
            return Err(UartError(n));
        }
        Ok(n as usize)
    }

    fn flush(&mut self) -> Result<(), UartError> {
        Ok(())
    }

    fn available(&self) -> bool {
        let mut len: usize = 0;
        // SAFETY: read-only query of the driver's RX ring buffer.
        let ret = unsafe { esp_idf_svc::sys::uart_get_buffered_data_len(self.port, &mut len) };
        ret == esp_idf_svc::sys::ESP_OK && len > 0
    }
}

// ───────────────────────────────────────────────────────────────
// Loopback transport (host)
// ───────────────────────────────────────────────────────────────

/// In-memory serial port: tests queue input with [`inject`](Self::inject)
/// and inspect everything written with [`take_output`](Self::take_output).
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimSerial {
    rx: std::collections::VecDeque<u8>,
    tx: Vec<u8>,
}

#[cfg(not(target_os = "espidf"))]
impl SimSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Everything written so far, as text.  Clears the buffer.
    pub fn take_output(&mut self) -> std::string::String {
        let out = std::string::String::from_utf8_lossy(&self.tx).into_owned();
        self.tx.clear();
        out
    }
}

#[cfg(not(target_os = "espidf"))]
impl Transport for SimSerial {
    type Error = core::convert::Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn available(&self) -> bool {
        !self.rx.is_empty()
    }
}
