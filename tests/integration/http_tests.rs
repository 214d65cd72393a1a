//! Integration tests for the HTTP datastreams interface, driven through
//! [`EnerginoService::handle_http`] with mock hardware.

use crate::mock_hw::{MockFeed, MockHardware, Recorded, RecordingSink, SharedStorage};

use energino::app::service::EnerginoService;
use energino::config::BuildProfile;
use energino::protocol::http::HttpStatus;

fn make_service(hw: &mut MockHardware) -> (EnerginoService<SharedStorage>, RecordingSink) {
    let mut service = EnerginoService::new(SharedStorage::new(), BuildProfile::ethernet(), hw);
    let mut sink = RecordingSink::new();
    service.start(0, hw, &mut sink);
    (service, sink)
}

fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).expect("valid JSON body")
}

#[test]
fn switch_set_then_plain_read_reports_same_state() {
    let mut hw = MockHardware::new();
    let (mut service, mut sink) = make_service(&mut hw);

    let resp = service.handle_http("GET", "/arduino/datastreams/switch/1", &mut hw, &mut sink);
    assert_eq!(resp.status, HttpStatus::Ok);
    let v = json(&resp.body);
    assert_eq!(v["id"], "switch");
    assert_eq!(v["current_value"], 1);
    assert!(hw.relay);
    assert_eq!(sink.last(), Some(&Recorded::RelaySwitched(true)));

    let resp = service.handle_http("GET", "/arduino/datastreams/switch", &mut hw, &mut sink);
    assert_eq!(json(&resp.body)["current_value"], 1);
    assert!(hw.relay, "plain read must not touch the relay");
    assert_eq!(hw.relay_writes, vec![false, true]);
}

#[test]
fn snapshot_lists_all_datastreams_from_live_average() {
    let mut hw = MockHardware::with_raw(512, 600);
    let (mut service, mut sink) = make_service(&mut hw);
    for _ in 0..8 {
        service.sample(&mut hw);
    }

    let resp = service.handle_http("GET", "/arduino/datastreams", &mut hw, &mut sink);
    let v = json(&resp.body);
    assert_eq!(v["version"], "1.0.0");
    let ids: Vec<_> = v["datastreams"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["voltage", "current", "power", "switch"]);
    assert_eq!(v["datastreams"][0]["current_value"], 12.25);
    assert_eq!(v["datastreams"][1]["current_value"], 2.323);
}

#[test]
fn empty_epoch_serves_previous_report() {
    let mut hw = MockHardware::with_raw(512, 600);
    let (mut service, mut sink) = make_service(&mut hw);
    service.sample(&mut hw);
    service.report(5000, &hw, &mut MockFeed::default(), &mut sink);

    let resp = service.handle_http("GET", "/arduino/datastreams/voltage", &mut hw, &mut sink);
    assert_eq!(json(&resp.body)["current_value"], 12.25);
}

#[test]
fn single_metric_reads() {
    let mut hw = MockHardware::with_raw(512, 600);
    let (mut service, mut sink) = make_service(&mut hw);
    service.sample(&mut hw);
    let resp = service.handle_http("GET", "/arduino/datastreams/power", &mut hw, &mut sink);
    let v = json(&resp.body);
    assert_eq!(v["id"], "power");
    assert_eq!(v["current_value"], 28.452);
}

#[test]
fn unsupported_requests() {
    let mut hw = MockHardware::new();
    let (mut service, mut sink) = make_service(&mut hw);

    let resp = service.handle_http("GET", "/arduino/datastreams/frequency", &mut hw, &mut sink);
    assert_eq!(resp.status, HttpStatus::NotFound);
    assert!(resp.to_wire().starts_with("HTTP/1.1 404 "));

    let resp = service.handle_http("PUT", "/arduino/datastreams/switch/1", &mut hw, &mut sink);
    assert_eq!(resp.status, HttpStatus::NotImplemented);
    assert!(!hw.relay, "rejected request must not switch the relay");
}
