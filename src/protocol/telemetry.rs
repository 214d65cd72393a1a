//! Serial line rendering: telemetry records, command echoes, settings dump.
//!
//! Telemetry record, one per report period:
//! ```text
//! #<magic>,<rev>,<V>,<I>,<P>,<relay>,<period>,<samples>,<verr mV>,<ierr mA>\n      (serial)
//! #<magic>,<rev>,<V>,<I>,<P>,<relay>,<period>,<samples>,<feed>,<endpoint>,<key>\n (networked)
//! ```
//! Volts and amps carry 3 decimals, watts 2.  Echo lines start with `@`
//! so a collector can tell them from records.

use core::fmt::{self, Write};

use crate::config::{Addressing, BuildProfile, ReportLayout};
use crate::measure::Reading;
use crate::settings::{FieldValue, Settings};

/// Telemetry line capacity.  The longest accepted settings (`r2` and
/// `sensitivity` of 1, `r1` and `feedid` at `u32::MAX`, offset at
/// `i32::MIN`, full key and URL) render a 214-byte networked record.
pub const LINE_CAP: usize = 256;

/// Write one telemetry record, newline included.
pub fn write_report<W: Write>(
    w: &mut W,
    reading: &Reading,
    settings: &Settings,
    profile: &BuildProfile,
) -> fmt::Result {
    write!(
        w,
        "#{},{},{:.3},{:.3},{:.2},{},{},{}",
        settings.magic,
        settings.revision,
        reading.voltage,
        reading.current,
        reading.power,
        u8::from(reading.relay_high),
        settings.effective_period(profile),
        reading.samples,
    )?;
    match profile.layout() {
        ReportLayout::ErrorBounds => write!(
            w,
            ",{},{}",
            reading.voltage_error_mv, reading.current_error_ma
        )?,
        ReportLayout::Feed => {
            write!(w, ",{},", settings.feedid)?;
            write_endpoint(w, settings, profile)?;
            write!(w, ",{}", settings.apikey)?;
        }
    }
    w.write_char('\n')
}

fn write_endpoint<W: Write>(w: &mut W, settings: &Settings, profile: &BuildProfile) -> fmt::Result {
    match profile.addressing() {
        Addressing::Url | Addressing::None => w.write_str(&settings.feedsurl),
        Addressing::HostPort => write!(w, "{}:{}", settings.host_addr(), settings.port),
    }
}

/// Confirmation line for a stored settings value.
pub fn write_echo<W: Write>(w: &mut W, value: &FieldValue) -> fmt::Result {
    match value {
        FieldValue::Period(v) => writeln!(w, "@period: {} ms", v),
        FieldValue::R1(v) => writeln!(w, "@r1: {} Kohm", v),
        FieldValue::R2(v) => writeln!(w, "@r2: {} Kohm", v),
        FieldValue::Offset(v) => writeln!(w, "@offset: {} mV", v),
        FieldValue::Sensitivity(v) => writeln!(w, "@sensitivity: {} mV/A", v),
        FieldValue::FeedId(v) => writeln!(w, "@feed: {}", v),
        FieldValue::ApiKey(v) => writeln!(w, "@key: {}", v),
        FieldValue::FeedUrl(v) => writeln!(w, "@url: {}", v),
        FieldValue::Host(v) => writeln!(w, "@host: {}.{}.{}.{}", v[0], v[1], v[2], v[3]),
        FieldValue::Port(v) => writeln!(w, "@port: {}", v),
    }
}

pub fn write_switch<W: Write>(w: &mut W, high: bool) -> fmt::Result {
    writeln!(w, "@switch: {}", if high { "high" } else { "low" })
}

pub fn write_reset<W: Write>(w: &mut W) -> fmt::Result {
    writeln!(w, "@reset")
}

pub fn write_offset<W: Write>(w: &mut W, offset_mv: i32) -> fmt::Result {
    writeln!(w, "@offset: {} mV", offset_mv)
}

/// Human-readable dump of every field, one per line.
pub fn write_dump<W: Write>(w: &mut W, settings: &Settings, profile: &BuildProfile) -> fmt::Result {
    writeln!(w, "@magic: {}", settings.magic)?;
    writeln!(w, "@revision: {}", settings.revision)?;
    writeln!(w, "@period: {} ms", settings.period)?;
    writeln!(w, "@r1: {} Kohm", settings.r1)?;
    writeln!(w, "@r2: {} Kohm", settings.r2)?;
    writeln!(w, "@offset: {} mV", settings.offset)?;
    writeln!(w, "@sensitivity: {} mV/A", settings.sensitivity)?;
    writeln!(w, "@relaypin: {}", settings.relaypin)?;
    writeln!(w, "@currentpin: {}", settings.currentpin)?;
    writeln!(w, "@voltagepin: {}", settings.voltagepin)?;
    if profile.is_networked() {
        let m = &settings.mac;
        writeln!(
            w,
            "@mac: {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )?;
        writeln!(w, "@feed: {}", settings.feedid)?;
        writeln!(w, "@key: {}", settings.apikey)?;
        match profile.addressing() {
            Addressing::HostPort => {
                writeln!(w, "@host: {}", settings.host_addr())?;
                writeln!(w, "@port: {}", settings.port)?;
            }
            _ => writeln!(w, "@url: {}", settings.feedsurl)?,
        }
    }
    Ok(())
}
