//! Relay driver.
//!
//! Generic over an [`embedded_hal::digital::OutputPin`] so the same
//! driver runs on the board ([`GpioPin`]) and against a recording pin in
//! tests.  The driver remembers the level it last drove; the pin is
//! never read back.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::warn;

use crate::drivers::hw_init;

/// Raw ESP-IDF output pin, configured by [`hw_init`].
#[derive(Debug, Clone, Copy)]
pub struct GpioPin(pub i32);

impl ErrorType for GpioPin {
    type Error = Infallible;
}

impl OutputPin for GpioPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        hw_init::gpio_write(self.0, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        hw_init::gpio_write(self.0, true);
        Ok(())
    }
}

pub struct RelayDriver<P: OutputPin> {
    pin: P,
    high: bool,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Take the pin and drive it low.
    pub fn new(pin: P) -> Self {
        let mut relay = Self { pin, high: true };
        relay.set(false);
        relay
    }

    pub fn set(&mut self, high: bool) {
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.high = high,
            Err(e) => warn!("Relay: pin write failed ({:?})", e),
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}
