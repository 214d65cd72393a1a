//! Measurement pipeline: raw samples → averages → physical units.
//!
//! [`Meter`] owns one [`SampleAverager`] per analog channel.  The
//! service pushes samples into it at the acquisition cadence and closes a
//! period at the report cadence, getting a [`Reading`] back.

pub mod averaging;
pub mod conversion;

use averaging::{Average, AveragingPolicy, SampleAverager};
use conversion::Calibration;

/// One report's worth of converted values.  Discarded after emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Volts.
    pub voltage: f64,
    /// Amps.
    pub current: f64,
    /// Watts.
    pub power: f64,
    /// Relay pin level at report time.
    pub relay_high: bool,
    /// Samples behind this average (current channel).
    pub samples: u32,
    /// Milliseconds covered since the previous report.
    pub elapsed_ms: u64,
    /// Voltage quantization error bound (mV).
    pub voltage_error_mv: u32,
    /// Current quantization error bound (mA).
    pub current_error_ma: u32,
}

/// Paired voltage/current accumulators.
#[derive(Debug, Clone)]
pub struct Meter {
    voltage: SampleAverager,
    current: SampleAverager,
}

impl Meter {
    pub fn new(policy: AveragingPolicy) -> Self {
        Self {
            voltage: SampleAverager::new(policy),
            current: SampleAverager::new(policy),
        }
    }

    pub fn push(&mut self, raw_voltage: u16, raw_current: u16) {
        self.voltage.push(raw_voltage);
        self.current.push(raw_current);
    }

    /// Close the period and convert.
    pub fn finish_period(
        &mut self,
        cal: &Calibration,
        relay_high: bool,
        elapsed_ms: u64,
    ) -> Reading {
        let v = self.voltage.finish_period();
        let i = self.current.finish_period();
        convert(cal, v, i, relay_high, elapsed_ms)
    }

    /// Convert the running averages without closing the period.
    pub fn peek(&self, cal: &Calibration, relay_high: bool) -> Reading {
        convert(cal, self.voltage.average(), self.current.average(), relay_high, 0)
    }
}

fn convert(
    cal: &Calibration,
    v: Average,
    i: Average,
    relay_high: bool,
    elapsed_ms: u64,
) -> Reading {
    let voltage = cal.voltage(v.raw);
    let current = cal.current(i.raw);
    Reading {
        voltage,
        current,
        power: voltage * current,
        relay_high,
        samples: i.samples,
        elapsed_ms,
        voltage_error_mv: cal.voltage_error_mv(),
        current_error_ma: cal.current_error_ma(),
    }
}
