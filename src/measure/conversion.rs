//! Raw ADC counts → volts, amps, watts.
//!
//! Voltage is measured through a resistor divider (`r1` on top, `r2` to
//! ground); current through a Hall-effect sensor with a zero-current
//! `offset` (mV) and a `sensitivity` (mV/A).  The ADC is 10-bit, so one
//! count is `aref / 1024` millivolts.
//!
//! Divisors (`r2`, `sensitivity`) are guaranteed non-zero by
//! [`Settings::validate`](crate::settings::Settings::validate); a zero here
//! still yields `0.0` rather than `inf`/`NaN`.

use crate::settings::Settings;

/// Full-scale count of the 10-bit ADC.
pub const ADC_STEPS: f64 = 1024.0;

/// Calibration snapshot used to convert one report's averages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub aref_mv: u32,
    pub r1: u32,
    pub r2: u32,
    pub offset_mv: i32,
    pub sensitivity: u32,
}

impl Calibration {
    pub fn new(settings: &Settings, aref_mv: u32) -> Self {
        Self {
            aref_mv,
            r1: settings.r1,
            r2: settings.r2,
            offset_mv: settings.offset,
            sensitivity: settings.sensitivity,
        }
    }

    /// Millivolts per ADC count.
    pub fn resolution_mv(&self) -> f64 {
        f64::from(self.aref_mv) / ADC_STEPS
    }

    fn divider_gain(&self) -> f64 {
        if self.r2 == 0 {
            return 0.0;
        }
        (f64::from(self.r1) + f64::from(self.r2)) / f64::from(self.r2)
    }

    /// Mean raw count → bus voltage in volts, never negative.
    pub fn voltage(&self, raw_avg: f64) -> f64 {
        let mv = raw_avg * self.resolution_mv() * self.divider_gain();
        if mv > 0.0 { mv / 1000.0 } else { 0.0 }
    }

    /// Mean raw count → load current in amps, never negative.
    pub fn current(&self, raw_avg: f64) -> f64 {
        if self.sensitivity == 0 {
            return 0.0;
        }
        let v_out = raw_avg * self.resolution_mv();
        let amps = (v_out - f64::from(self.offset_mv)) / f64::from(self.sensitivity);
        if amps > 0.0 { amps } else { 0.0 }
    }

    /// Mean raw counts → power in watts.
    pub fn power(&self, raw_voltage: f64, raw_current: f64) -> f64 {
        self.voltage(raw_voltage) * self.current(raw_current)
    }

    /// Worst-case voltage quantization error (mV, truncated).
    pub fn voltage_error_mv(&self) -> u32 {
        (self.resolution_mv() * self.divider_gain()) as u32
    }

    /// Worst-case current quantization error (mA, truncated).
    pub fn current_error_ma(&self) -> u32 {
        if self.sensitivity == 0 {
            return 0;
        }
        (self.resolution_mv() / f64::from(self.sensitivity) * 1000.0) as u32
    }

    /// Raw count → millivolts at the ADC pin, as used by offset calibration.
    pub fn raw_to_mv(&self, raw_avg: f64) -> f64 {
        raw_avg * self.resolution_mv()
    }
}
