//! Device identity derived from the persisted MAC address.
//!
//! Energino boards have no factory MAC, so one is generated on first boot
//! (or after a settings reset on a fresh unit) and stored in
//! [`Settings`](crate::settings::Settings).  The generator is seeded from
//! a floating analog input, which is noisy enough that two units flashed
//! side by side are unlikely to collide.
//!
//! From the MAC we derive:
//! - the short device id `EN-XXYYZZ` (startup log, telemetry collectors)
//! - the network hostname `energino-xxyyzz`

use core::fmt::Write;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Fixed-size device ID string: "EN-XXYYZZ".
pub type DeviceIdString = heapless::String<16>;

/// Locally administered, unicast.
const LOCAL_ADMIN_BIT: u8 = 0b0000_0010;
const MULTICAST_BIT: u8 = 0b0000_0001;

/// Generate a locally administered unicast MAC from `seed`.
pub fn generate_mac(seed: u64) -> MacAddress {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut mac: MacAddress = [0u8; 6];
    rng.fill_bytes(&mut mac);
    mac[0] = (mac[0] | LOCAL_ADMIN_BIT) & !MULTICAST_BIT;
    mac
}

/// Whether `mac` looks like one [`generate_mac`] produced.
pub fn is_assigned(mac: &MacAddress) -> bool {
    mac[0] & LOCAL_ADMIN_BIT != 0 && mac[0] & MULTICAST_BIT == 0
}

/// Fold several floating-input readings into a PRNG seed.
pub fn seed_from_noise(samples: impl IntoIterator<Item = u16>) -> u64 {
    samples
        .into_iter()
        .fold(0xcbf2_9ce4_8422_2325, |acc, s| {
            (acc ^ u64::from(s)).wrapping_mul(0x0000_0100_0000_01b3)
        })
}

/// Derive the short device ID from the last 3 MAC bytes.
/// Format: `EN-XXYYZZ` (e.g., `EN-EFCAFE`).
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = write!(id, "EN-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// Derive the network hostname from the last 3 MAC bytes.
/// Format: `energino-xxyyzz`.
pub fn hostname(mac: &MacAddress) -> heapless::String<24> {
    let mut name = heapless::String::<24>::new();
    let _ = write!(name, "energino-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}
