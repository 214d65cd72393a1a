//! Integration tests for the serial command → service → settings/relay
//! pipeline and the report path.
//!
//! These run on the host (x86_64) and drive [`EnerginoService`] exactly
//! the way the main loop does: sample, drain the serial port, report.

use crate::mock_hw::{MockFeed, MockHardware, Recorded, RecordingSink, SharedStorage};

use energino::adapters::serial::{SerialEventSink, SimSerial, serve_serial};
use energino::app::service::EnerginoService;
use energino::config::BuildProfile;
use energino::error::CommsError;
use energino::protocol::parser::Malformed;
use energino::settings::{FieldValue, Rejected};

fn make_service(
    profile: BuildProfile,
    hw: &mut MockHardware,
) -> (EnerginoService<SharedStorage>, SharedStorage, RecordingSink) {
    let storage = SharedStorage::new();
    let mut service = EnerginoService::new(storage.clone(), profile, hw);
    let mut sink = RecordingSink::new();
    service.start(0, hw, &mut sink);
    (service, storage, sink)
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_drives_relay_low_and_announces() {
    let mut hw = MockHardware::new();
    hw.relay = true;
    let (_service, _storage, sink) = make_service(BuildProfile::serial(), &mut hw);
    assert_eq!(hw.relay_writes, vec![false]);
    assert_eq!(sink.events, vec![Recorded::Started]);
}

#[test]
fn fresh_storage_gets_defaults_written() {
    let mut hw = MockHardware::new();
    let (service, storage, _sink) = make_service(BuildProfile::serial(), &mut hw);
    assert_eq!(service.settings().magic.as_str(), "Energino");
    assert_eq!(service.settings().period, 2000);
    assert_eq!(storage.write_count(), 1);
}

// ── Sampling & reporting ──────────────────────────────────────

#[test]
fn four_samples_at_512_convert_to_12_25_volts() {
    let mut hw = MockHardware::with_raw(512, 600);
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    for _ in 0..4 {
        service.sample(&mut hw);
    }
    let reading = service.report(2000, &hw, &mut MockFeed::default(), &mut sink);

    assert_eq!(format!("{:.3}", reading.voltage), "12.250");
    assert_eq!(format!("{:.3}", reading.current), "2.323");
    assert_eq!(format!("{:.2}", reading.power), "28.45");
    assert_eq!(reading.samples, 4);
    assert_eq!(reading.elapsed_ms, 2000);
    assert_eq!(sink.reports(), vec![reading]);
}

#[test]
fn empty_period_reports_zeroes() {
    let mut hw = MockHardware::with_raw(512, 600);
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    let reading = service.report(2000, &hw, &mut MockFeed::default(), &mut sink);
    assert_eq!(reading.samples, 0);
    assert_eq!(reading.voltage, 0.0);
    assert_eq!(reading.current, 0.0);
    assert_eq!(reading.power, 0.0);
}

#[test]
fn epoch_accumulator_restarts_after_each_report() {
    let mut hw = MockHardware::with_raw(512, 512);
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    let mut feed = MockFeed::default();
    for _ in 0..10 {
        service.sample(&mut hw);
    }
    assert_eq!(service.report(100, &hw, &mut feed, &mut sink).samples, 10);
    service.sample(&mut hw);
    assert_eq!(service.report(200, &hw, &mut feed, &mut sink).samples, 1);
}

#[test]
fn sliding_window_keeps_samples_across_reports() {
    let mut hw = MockHardware::with_raw(512, 512);
    let (mut service, _storage, mut sink) = make_service(BuildProfile::poe(), &mut hw);
    let mut feed = MockFeed::default();
    for _ in 0..40 {
        service.sample(&mut hw);
    }
    assert_eq!(service.report(100, &hw, &mut feed, &mut sink).samples, 32);
    assert_eq!(service.report(200, &hw, &mut feed, &mut sink).samples, 32);
}

#[test]
fn report_carries_relay_level() {
    let mut hw = MockHardware::with_raw(512, 512);
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    service.poll_serial(b"#S1\n", &mut hw, &mut sink);
    let reading = service.report(100, &hw, &mut MockFeed::default(), &mut sink);
    assert!(reading.relay_high);
}

// ── Remote feed ───────────────────────────────────────────────

#[test]
fn networked_variant_pushes_when_feed_enabled() {
    let mut hw = MockHardware::with_raw(512, 600);
    let (mut service, _storage, mut sink) = make_service(BuildProfile::ethernet(), &mut hw);
    let mut feed = MockFeed::default();

    service.sample(&mut hw);
    service.report(5000, &hw, &mut feed, &mut sink);
    assert!(feed.pushed.is_empty(), "feed id 0 disables the push");

    service.poll_serial(b"#F42\n#Ksecret\n", &mut hw, &mut sink);
    service.sample(&mut hw);
    service.report(10_000, &hw, &mut feed, &mut sink);

    assert_eq!(feed.pushed.len(), 1);
    let req = &feed.pushed[0];
    assert!(req.starts_with("PUT /v2/feeds/42.csv HTTP/1.1\r\n"), "{req}");
    assert!(req.contains("Host: 216.52.233.120\r\n"));
    assert!(req.contains("X-ApiKey: secret\r\n"));
    assert!(req.ends_with("voltage,12.250\ncurrent,2.323\npower,28.45\nswitch,0\n"));
}

#[test]
fn serial_variant_never_pushes() {
    let mut hw = MockHardware::with_raw(512, 600);
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    let mut feed = MockFeed::default();
    service.poll_serial(b"#F42\n", &mut hw, &mut sink);
    service.sample(&mut hw);
    service.report(5000, &hw, &mut feed, &mut sink);
    assert!(feed.pushed.is_empty());
}

#[test]
fn failed_push_is_reported_and_dropped() {
    let mut hw = MockHardware::with_raw(512, 600);
    let (mut service, _storage, mut sink) = make_service(BuildProfile::yun(), &mut hw);
    let mut feed = MockFeed {
        fail_with: Some(CommsError::Timeout),
        ..MockFeed::default()
    };
    service.poll_serial(b"#F7\n", &mut hw, &mut sink);
    sink.take();

    service.sample(&mut hw);
    service.report(5000, &hw, &mut feed, &mut sink);

    let events = sink.take();
    assert!(matches!(events[0], Recorded::Report(_)));
    assert_eq!(events[1], Recorded::FeedPushFailed(CommsError::Timeout));

    // Next period proceeds normally.
    feed.fail_with = None;
    service.sample(&mut hw);
    service.report(10_000, &hw, &mut feed, &mut sink);
    assert_eq!(feed.pushed.len(), 1);
}

// ── Serial commands ───────────────────────────────────────────

#[test]
fn feed_id_set_then_negative_rejected() {
    let mut hw = MockHardware::new();
    let (mut service, storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);

    service.poll_serial(b"#F1234", &mut hw, &mut sink);
    assert_eq!(service.settings().feedid, 1234);
    assert_eq!(sink.last(), Some(&Recorded::SettingChanged(FieldValue::FeedId(1234))));

    service.poll_serial(b"#F-1", &mut hw, &mut sink);
    assert_eq!(service.settings().feedid, 1234);
    assert_eq!(sink.last(), Some(&Recorded::ValueRejected(Rejected::Negative)));

    // Survives a reboot.
    let rebooted = EnerginoService::new(storage.clone(), BuildProfile::serial(), &mut hw);
    assert_eq!(rebooted.settings().feedid, 1234);
}

#[test]
fn relay_commands_follow_normally_closed_polarity() {
    let mut hw = MockHardware::new();
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);

    service.poll_serial(b"#S0", &mut hw, &mut sink);
    assert!(!hw.relay);
    assert!(service.load_on(&hw), "#S0 powers the load");

    service.poll_serial(b"#S1", &mut hw, &mut sink);
    assert!(hw.relay);
    assert!(!service.load_on(&hw), "#S1 cuts the load");
    assert_eq!(sink.last(), Some(&Recorded::RelaySwitched(true)));
}

#[test]
fn period_floor_applies_only_with_feed_enabled() {
    let mut hw = MockHardware::new();
    let (mut service, _storage, mut sink) = make_service(BuildProfile::ethernet(), &mut hw);

    service.poll_serial(b"#P100\n", &mut hw, &mut sink);
    assert_eq!(service.settings().period, 100);
    assert_eq!(service.report_period_ms(), 100);

    service.poll_serial(b"#F9\n", &mut hw, &mut sink);
    assert_eq!(service.settings().period, 5000, "enabling the feed raises the period");

    service.poll_serial(b"#P100\n", &mut hw, &mut sink);
    assert_eq!(sink.last(), Some(&Recorded::SettingChanged(FieldValue::Period(5000))));
    assert_eq!(service.report_period_ms(), 5000);

    service.poll_serial(b"#P7000\n", &mut hw, &mut sink);
    assert_eq!(service.report_period_ms(), 7000);
}

#[test]
fn zero_divisors_are_rejected() {
    let mut hw = MockHardware::new();
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    sink.take();
    service.poll_serial(b"#B0\n#D0\n", &mut hw, &mut sink);
    assert_eq!(
        sink.take(),
        vec![
            Recorded::ValueRejected(Rejected::ZeroDivisor),
            Recorded::ValueRejected(Rejected::ZeroDivisor),
        ]
    );
    assert_eq!(service.settings().r2, 100);
    assert_eq!(service.settings().sensitivity, 185);
}

#[test]
fn reset_is_idempotent_and_keeps_mac() {
    let mut hw = MockHardware::new();
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    let mac = service.settings().mac;

    service.poll_serial(b"#P321\n#A1\n#C-40\n", &mut hw, &mut sink);
    service.poll_serial(b"#R\n", &mut hw, &mut sink);
    let first = service.settings().clone();
    hw.floating_raw = 0x2AA;
    service.poll_serial(b"#R\n", &mut hw, &mut sink);

    assert_eq!(service.settings(), &first);
    assert_eq!(first.period, 2000);
    assert_eq!(first.r1, 390);
    assert_eq!(first.offset, 2500);
    assert_eq!(first.mac, mac);
    assert_eq!(sink.last(), Some(&Recorded::SettingsReset));
}

#[test]
fn calibrate_offset_averages_current_channel() {
    let mut hw = MockHardware::with_raw(0, 512);
    let (mut service, storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    service.poll_serial(b"#C0\n", &mut hw, &mut sink);
    service.poll_serial(b"#T\n", &mut hw, &mut sink);
    assert_eq!(sink.last(), Some(&Recorded::OffsetCalibrated(2500)));
    assert_eq!(service.settings().offset, 2500);

    let rebooted = EnerginoService::new(storage.clone(), BuildProfile::serial(), &mut hw);
    assert_eq!(rebooted.settings().offset, 2500);
}

#[test]
fn dump_request_emits_dump() {
    let mut hw = MockHardware::new();
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    service.poll_serial(b"#Z\n", &mut hw, &mut sink);
    assert_eq!(sink.last(), Some(&Recorded::SettingsDump));
}

#[test]
fn malformed_frames_change_nothing() {
    let mut hw = MockHardware::new();
    let (mut service, storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    let before = service.settings().clone();
    let writes = storage.write_count();
    sink.take();

    service.poll_serial(b"#Q1\n#Pabc\nxyz\n", &mut hw, &mut sink);

    assert_eq!(
        sink.take(),
        vec![
            Recorded::FrameRejected(Malformed::UnknownTag(b'Q')),
            Recorded::FrameRejected(Malformed::BadPayload(b'P')),
            Recorded::FrameRejected(Malformed::MissingStart),
        ]
    );
    assert_eq!(service.settings(), &before);
    assert_eq!(storage.write_count(), writes);
}

#[test]
fn frame_split_across_bursts() {
    let mut hw = MockHardware::new();
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    service.poll_serial(b"#P", &mut hw, &mut sink);
    assert_eq!(service.settings().period, 2000);
    service.poll_serial(b"250\n", &mut hw, &mut sink);
    assert_eq!(service.settings().period, 250);
}

#[test]
fn several_commands_in_one_burst_apply_in_order() {
    let mut hw = MockHardware::new();
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    sink.take();
    service.poll_serial(b"#A470\r\n#B47\r\n#S1\r\n", &mut hw, &mut sink);
    assert_eq!(
        sink.take(),
        vec![
            Recorded::SettingChanged(FieldValue::R1(470)),
            Recorded::SettingChanged(FieldValue::R2(47)),
            Recorded::RelaySwitched(true),
        ]
    );
}

#[test]
fn many_commands_in_one_burst_all_apply() {
    let mut hw = MockHardware::new();
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    sink.take();
    let burst = format!("{}#P777\n", "#A1\n".repeat(20));
    service.poll_serial(burst.as_bytes(), &mut hw, &mut sink);

    let events = sink.take();
    assert_eq!(events.len(), 21);
    assert_eq!(events[20], Recorded::SettingChanged(FieldValue::Period(777)));
    assert_eq!(service.settings().period, 777);
}

#[test]
fn rejections_keep_their_place_in_the_burst() {
    let mut hw = MockHardware::new();
    let (mut service, _storage, mut sink) = make_service(BuildProfile::serial(), &mut hw);
    sink.take();
    service.poll_serial(b"#P100\n#Q\n#B47\n", &mut hw, &mut sink);
    assert_eq!(
        sink.take(),
        vec![
            Recorded::SettingChanged(FieldValue::Period(100)),
            Recorded::FrameRejected(Malformed::UnknownTag(b'Q')),
            Recorded::SettingChanged(FieldValue::R2(47)),
        ]
    );
}

// ── Serial port draining ──────────────────────────────────────

type SerialSinks = (SerialEventSink<SimSerial>, RecordingSink);

fn serial_sinks(profile: BuildProfile) -> SerialSinks {
    (SerialEventSink::new(SimSerial::new(), profile), RecordingSink::new())
}

#[test]
fn burst_longer_than_read_chunk_keeps_frames_whole() {
    let mut hw = MockHardware::new();
    let (mut service, _storage, _sink) = make_service(BuildProfile::serial(), &mut hw);
    let mut sinks = serial_sinks(BuildProfile::serial());

    // 130 bytes: the 128-byte chunk ends inside the period frame.
    let burst = format!("{}#P1234567\n", "#A12345\n".repeat(15));
    sinks.0.transport_mut().inject(burst.as_bytes());
    let mut rx = [0u8; 128];
    assert_eq!(serve_serial(&mut service, &mut sinks, &mut hw, &mut rx), 130);

    assert_eq!(service.settings().period, 1_234_567);
    assert_eq!(service.settings().r1, 12_345);
    assert!(!sinks.1.events.iter().any(|e| matches!(e, Recorded::FrameRejected(_))));

    let out = sinks.0.transport_mut().take_output();
    assert_eq!(out.matches("@r1: 12345 Kohm\n").count(), 15);
    assert!(out.ends_with("@period: 1234567 ms\n"), "{out}");
}

#[test]
fn idle_port_leaves_partial_frame_pending() {
    let mut hw = MockHardware::new();
    let (mut service, _storage, _sink) = make_service(BuildProfile::serial(), &mut hw);
    let mut sinks = serial_sinks(BuildProfile::serial());
    let mut rx = [0u8; 128];

    assert_eq!(serve_serial(&mut service, &mut sinks, &mut hw, &mut rx), 0);
    sinks.0.transport_mut().inject(b"#P4");
    serve_serial(&mut service, &mut sinks, &mut hw, &mut rx);
    assert_eq!(service.settings().period, 2000);

    sinks.0.transport_mut().inject(b"50\n");
    serve_serial(&mut service, &mut sinks, &mut hw, &mut rx);
    assert_eq!(service.settings().period, 450);
}

#[test]
fn widest_report_reaches_serial_intact() {
    let profile = BuildProfile::poe();
    let mut hw = MockHardware::with_raw(1023, 1023);
    let (mut service, _storage, _sink) = make_service(profile, &mut hw);
    let mut sinks = serial_sinks(profile);
    let mut rx = [0u8; 128];

    let key = "k".repeat(48);
    let url = "u".repeat(59);
    let commands = format!(
        "#F4294967295\n#P4294967295\n#A4294967295\n#B1\n#C-2147483648\n#D1\n#K{key}\n#U{url}\n"
    );
    sinks.0.transport_mut().inject(commands.as_bytes());
    serve_serial(&mut service, &mut sinks, &mut hw, &mut rx);
    assert_eq!(service.settings().offset, i32::MIN);
    sinks.0.transport_mut().take_output();

    service.sample(&mut hw);
    service.report(5000, &hw, &mut MockFeed::default(), &mut sinks);

    let out = sinks.0.transport_mut().take_output();
    let line = out.lines().next().unwrap();
    assert!(line.starts_with("#EnerginoPOE,1,"), "{line}");
    assert!(line.ends_with(&format!(",4294967295,{url},{key}")), "{line}");
    assert!(out.ends_with('\n'));
}
