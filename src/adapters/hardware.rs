//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the relay driver and reads the ADC through
//! [`hw_init`](crate::drivers::hw_init), exposing them as [`AnalogPort`]
//! and [`RelayPort`].  This is the only module in the system that
//! touches actual hardware.  On non-espidf targets the ADC reads come
//! from the simulation slots in `hw_init`.

use crate::app::ports::{AnalogChannel, AnalogPort, RelayPort};
use crate::drivers::hw_init;
use crate::drivers::relay::{GpioPin, RelayDriver};
use crate::pins;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    relay: RelayDriver<GpioPin>,
}

impl HardwareAdapter {
    /// Takes the relay pin and drives it low.
    pub fn new() -> Self {
        Self {
            relay: RelayDriver::new(GpioPin(pins::RELAY_GPIO)),
        }
    }
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Native ADC counts down to the 10-bit scale the calibration model uses.
fn to_model_scale(raw: u16) -> u16 {
    raw >> (pins::ADC_NATIVE_BITS - pins::ADC_MODEL_BITS)
}

// ── AnalogPort implementation ─────────────────────────────────

impl AnalogPort for HardwareAdapter {
    fn read_raw(&mut self, channel: AnalogChannel) -> u16 {
        let adc = match channel {
            AnalogChannel::Voltage => pins::VOLTAGE_ADC_CHANNEL,
            AnalogChannel::Current => pins::CURRENT_ADC_CHANNEL,
            AnalogChannel::Floating => pins::FLOATING_ADC_CHANNEL,
        };
        to_model_scale(hw_init::adc1_read(adc))
    }
}

// ── RelayPort implementation ──────────────────────────────────

impl RelayPort for HardwareAdapter {
    fn set_relay(&mut self, high: bool) {
        self.relay.set(high);
    }

    fn relay_high(&self) -> bool {
        self.relay.is_high()
    }
}
