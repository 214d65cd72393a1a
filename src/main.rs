//! Energino Firmware: Main Entry Point
//!
//! Hexagonal architecture with a cadence-driven event loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    SerialEventSink   NvsAdapter  MonotonicClock│
//! │  (Analog+Relay)     + LogEventSink    (Storage)                │
//! │  TcpFeedClient      HttpServer                                 │
//! │  (FeedPort)         (datastreams)                              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            EnerginoService (pure logic)                │    │
//! │  │  Meter · Settings · Command parser                     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  CadenceScheduler ──▶ EventQueue ──▶ loop                      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The network interface itself (Ethernet PHY / bridge, DHCP) is brought
//! up by the platform before `main` runs; this binary only opens sockets.
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use log::info;

use energino::adapters::feed_client::TcpFeedClient;
use energino::adapters::hardware::HardwareAdapter;
use energino::adapters::http_server::HttpServer;
use energino::adapters::log_sink::LogEventSink;
use energino::adapters::nvs::NvsAdapter;
use energino::adapters::serial::{self, SerialEventSink, UartTransport};
use energino::adapters::time::MonotonicClock;
use energino::app::service::EnerginoService;
use energino::config::BuildProfile;
use energino::drivers::hw_init;
use energino::error::Error;
use energino::events::{Event, EventQueue};
use energino::identity;
use energino::pins;
use energino::scheduler::CadenceScheduler;

/// Serial read chunk; a burst may span several.
const RX_CHUNK: usize = 128;

/// Longest the loop sleeps between polls.
const MAX_IDLE_MS: u64 = 5;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    let profile = BuildProfile::selected();
    info!("╔══════════════════════════════════════╗");
    info!("║  Energino v{} ({:?})", env!("CARGO_PKG_VERSION"), profile.variant);
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals().map_err(Error::from)?;
    let mut hw = HardwareAdapter::new();

    // ── 3. Settings + service ─────────────────────────────────
    let nvs = NvsAdapter::new().map_err(Error::from)?;
    let mut service = EnerginoService::new(nvs, profile, &mut hw);
    let mac = service.settings().mac;
    info!(
        "Device ID: {} (hostname: {})",
        identity::device_id(&mac),
        identity::hostname(&mac)
    );

    // ── 4. Outbound adapters ──────────────────────────────────
    let serial = SerialEventSink::new(UartTransport::new(pins::UART_PORT), profile);
    let mut sink = (serial, LogEventSink::new());
    let mut feed = TcpFeedClient::new(profile.feed_timeout_ms);
    let mut http = if profile.is_networked() {
        Some(HttpServer::bind(profile.http_port).map_err(Error::from)?)
    } else {
        None
    };

    // ── 5. Scheduler ──────────────────────────────────────────
    let clock = MonotonicClock::new();
    let start = clock.uptime_ms();
    let mut sched = CadenceScheduler::new(
        start,
        profile.sample_interval_ms,
        service.report_period_ms(),
    );
    let mut queue = EventQueue::new();
    service.start(start, &mut hw, &mut sink);

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    let mut rx = [0u8; RX_CHUNK];
    loop {
        let now = clock.uptime_ms();
        sched.tick(now, &mut queue);
        queue.push(Event::SerialPoll);
        if http.is_some() {
            queue.push(Event::HttpPoll);
        }

        queue.drain(|event| match event {
            Event::SampleTick => service.sample(&mut hw),

            Event::SerialPoll => {
                serial::serve_serial(&mut service, &mut sink, &mut hw, &mut rx);
            }

            Event::ReportTick => {
                service.report(clock.uptime_ms(), &hw, &mut feed, &mut sink);
            }

            Event::HttpPoll => {
                if let Some(server) = http.as_mut() {
                    server.poll(|method, path| service.handle_http(method, path, &mut hw, &mut sink));
                }
            }
        });

        // Commands may have changed the period or enabled the feed.
        sched.set_report_period(service.report_period_ms());

        let idle = sched
            .next_deadline()
            .saturating_sub(clock.uptime_ms())
            .min(MAX_IDLE_MS);
        if idle > 0 {
            std::thread::sleep(Duration::from_millis(idle));
        }
    }
}
