//! HTTP datastreams interface (networked variants).
//!
//! ```text
//! GET /<ns>/datastreams                 → all four datapoints
//! GET /<ns>/datastreams/<metric>        → one datapoint
//! GET /<ns>/datastreams/switch/<0|1>    → drive relay, then report it
//! ```
//! `<metric>` ∈ {voltage, current, power, switch}.  Anything but `GET`
//! is 501, any other path 404.  Socket handling lives in
//! [`adapters::http_server`](crate::adapters::http_server); this module
//! only routes and renders.

use std::string::String;

use serde::Serialize;

use crate::measure::Reading;

pub const API_VERSION: &str = "1.0.0";

/// A datapoint exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Voltage,
    Current,
    Power,
    Switch,
}

impl Metric {
    pub const ALL: [Self; 4] = [Self::Voltage, Self::Current, Self::Power, Self::Switch];

    pub fn id(self) -> &'static str {
        match self {
            Self::Voltage => "voltage",
            Self::Current => "current",
            Self::Power => "power",
            Self::Switch => "switch",
        }
    }

    fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }

    fn value(self, reading: &Reading) -> serde_json::Value {
        match self {
            Self::Voltage => round3(reading.voltage).into(),
            Self::Current => round3(reading.current).into(),
            Self::Power => round3(reading.power).into(),
            Self::Switch => u8::from(reading.relay_high).into(),
        }
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// What a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Snapshot,
    Metric(Metric),
    /// Drive the relay pin (`true` = high) and report it.
    SetSwitch(bool),
}

/// Non-200 outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok = 200,
    NotFound = 404,
    NotImplemented = 501,
}

impl HttpStatus {
    fn reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotFound => "Not Found",
            Self::NotImplemented => "Not Implemented",
        }
    }
}

/// Map method + path to a [`Route`].
pub fn route(method: &str, path: &str, namespace: &str) -> Result<Route, HttpStatus> {
    if method != "GET" {
        return Err(HttpStatus::NotImplemented);
    }
    let path = path.split('?').next().unwrap_or(path);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    if segments.next() != Some(namespace) || segments.next() != Some("datastreams") {
        return Err(HttpStatus::NotFound);
    }
    let route = match (segments.next(), segments.next()) {
        (None, _) => Route::Snapshot,
        (Some(id), None) => Route::Metric(Metric::from_id(id).ok_or(HttpStatus::NotFound)?),
        (Some("switch"), Some("0")) => Route::SetSwitch(false),
        (Some("switch"), Some("1")) => Route::SetSwitch(true),
        _ => return Err(HttpStatus::NotFound),
    };
    if segments.next().is_some() {
        return Err(HttpStatus::NotFound);
    }
    Ok(route)
}

#[derive(Serialize)]
struct Datapoint {
    id: &'static str,
    current_value: serde_json::Value,
}

#[derive(Serialize)]
struct Snapshot {
    version: &'static str,
    datastreams: [Datapoint; 4],
}

#[derive(Serialize)]
struct Single {
    version: &'static str,
    id: &'static str,
    current_value: serde_json::Value,
}

impl Single {
    fn new(metric: Metric, reading: &Reading) -> Self {
        Self {
            version: API_VERSION,
            id: metric.id(),
            current_value: metric.value(reading),
        }
    }
}

fn datapoint(metric: Metric, reading: &Reading) -> Datapoint {
    Datapoint {
        id: metric.id(),
        current_value: metric.value(reading),
    }
}

/// JSON body for a resolved route.  `reading` must already reflect any
/// relay change the route made.
pub fn render_body(route: Route, reading: &Reading) -> String {
    let result = match route {
        Route::Snapshot => serde_json::to_string(&Snapshot {
            version: API_VERSION,
            datastreams: Metric::ALL.map(|m| datapoint(m, reading)),
        }),
        Route::Metric(m) => serde_json::to_string(&Single::new(m, reading)),
        Route::SetSwitch(_) => serde_json::to_string(&Single::new(Metric::Switch, reading)),
    };
    result.unwrap_or_default()
}

/// A complete response ready for the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: HttpStatus,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: String) -> Self {
        Self {
            status: HttpStatus::Ok,
            body,
        }
    }

    pub fn error(status: HttpStatus) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    /// Serialise status line, headers and body.
    pub fn to_wire(&self) -> String {
        let content_type = if self.body.is_empty() {
            "text/plain"
        } else {
            "application/json"
        };
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status as u16,
            self.status.reason(),
            content_type,
            self.body.len(),
            self.body
        )
    }
}
