//! GPIO / peripheral pin assignments for the Energino board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  The numbering mirrors the defaults stamped
//! into the persisted settings (`voltagepin`, `currentpin`, `relaypin`).

// ---------------------------------------------------------------------------
// Analog front end (ADC1, 12 dB attenuation)
// ---------------------------------------------------------------------------

/// Supply-rail divider tap (R1 over R2).  ADC1 channel 0.
pub const VOLTAGE_ADC_GPIO: i32 = 1;
pub const VOLTAGE_ADC_CHANNEL: u32 = 0;

/// Hall-effect current sensor output.  ADC1 channel 1.
pub const CURRENT_ADC_GPIO: i32 = 2;
pub const CURRENT_ADC_CHANNEL: u32 = 1;

/// Left unconnected; its noise seeds the generated MAC address.
/// ADC1 channel 4.
pub const FLOATING_ADC_GPIO: i32 = 5;
pub const FLOATING_ADC_CHANNEL: u32 = 4;

/// The ESP32 ADC is 12-bit; the calibration model works in 10-bit counts.
pub const ADC_NATIVE_BITS: u32 = 12;
pub const ADC_MODEL_BITS: u32 = 10;

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Relay coil driver.  Low at power-on.
pub const RELAY_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// UART (command / telemetry port)
// ---------------------------------------------------------------------------

pub const UART_PORT: i32 = 0;
pub const UART_TX_GPIO: i32 = 43;
pub const UART_RX_GPIO: i32 = 44;
pub const UART_BAUD: u32 = 115_200;
