//! Build-time configuration.
//!
//! Every Energino board is the same sampling core wired to a different
//! output peripheral.  [`BuildProfile`] captures what differs between
//! them (magic tag, ADC reference, report layout, remote addressing) plus
//! the tunable timing constants.  The active profile is picked by cargo
//! feature; runtime-tunable values live in [`Settings`](crate::settings::Settings).

use crate::measure::averaging::AveragingPolicy;

/// Hardware/firmware variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Plain serial reporting, no network.
    Serial,
    /// Ethernet shield; remote endpoint addressed by IPv4 host + port.
    Ethernet,
    /// POE board with external 4.096 V reference; URL-addressed feed.
    Poe,
    /// Yun bridge; URL-addressed feed, REST served by the bridge.
    Yun,
}

/// Which trailing fields the serial telemetry line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLayout {
    /// `..., <voltage error mV>, <current error mA>`
    ErrorBounds,
    /// `..., <feed id>, <endpoint>, <api key>`
    Feed,
}

/// How the remote time-series endpoint is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// No remote endpoint on this variant.
    None,
    /// `feedsurl` holds the full base URL.
    Url,
    /// `host` + `port` hold the endpoint, path is fixed.
    HostPort,
}

/// Relay wiring convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPolarity {
    /// Load is powered while the relay pin is LOW (`#S0` = load on).
    NormallyClosed,
    /// Load is powered while the relay pin is HIGH (`#S1` = load on).
    NormallyOpen,
}

impl RelayPolarity {
    /// Whether the load is powered for the given pin level.
    pub fn load_on(self, pin_high: bool) -> bool {
        match self {
            Self::NormallyClosed => !pin_high,
            Self::NormallyOpen => pin_high,
        }
    }
}

/// Compile-time profile for one firmware variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildProfile {
    pub variant: Variant,
    /// Analog reference in millivolts (full scale of the 10-bit ADC).
    pub aref_mv: u32,
    pub averaging: AveragingPolicy,
    pub relay_polarity: RelayPolarity,
    /// Raw sample acquisition cadence (milliseconds).
    pub sample_interval_ms: u32,
    /// Lowest report period accepted while remote reporting is enabled.
    pub min_remote_period_ms: u32,
    /// Number of raw current samples averaged by `#T`.
    pub calibration_samples: u32,
    /// Hard bound on a single remote push (connect + write).
    pub feed_timeout_ms: u32,
    /// TCP port the HTTP datastream interface listens on.
    pub http_port: u16,
    /// First path segment of the HTTP interface (`/<namespace>/datastreams`).
    pub http_namespace: &'static str,
}

/// Persisted-record format version shared by every variant.
pub const SETTINGS_REVISION: u16 = 1;

impl BuildProfile {
    const BASE: Self = Self {
        variant: Variant::Serial,
        aref_mv: 5000,
        averaging: AveragingPolicy::Epoch,
        relay_polarity: RelayPolarity::NormallyClosed,
        sample_interval_ms: 10,
        min_remote_period_ms: 5000,
        calibration_samples: 1000,
        feed_timeout_ms: 3000,
        http_port: 80,
        http_namespace: "arduino",
    };

    pub const fn serial() -> Self {
        Self::BASE
    }

    pub const fn ethernet() -> Self {
        Self {
            variant: Variant::Ethernet,
            ..Self::BASE
        }
    }

    pub const fn poe() -> Self {
        Self {
            variant: Variant::Poe,
            aref_mv: 4096,
            averaging: AveragingPolicy::Window(32),
            ..Self::BASE
        }
    }

    pub const fn yun() -> Self {
        Self {
            variant: Variant::Yun,
            averaging: AveragingPolicy::Window(32),
            ..Self::BASE
        }
    }

    /// Profile selected by the `variant-*` cargo features.
    pub const fn selected() -> Self {
        if cfg!(feature = "variant-ethernet") {
            Self::ethernet()
        } else if cfg!(feature = "variant-poe") {
            Self::poe()
        } else if cfg!(feature = "variant-yun") {
            Self::yun()
        } else {
            Self::serial()
        }
    }

    /// Magic tag stamped into the persisted settings.
    pub const fn magic(&self) -> &'static str {
        match self.variant {
            Variant::Serial => "Energino",
            Variant::Ethernet => "EnerginoEth",
            Variant::Poe => "EnerginoPOE",
            Variant::Yun => "EnerginoYun",
        }
    }

    pub const fn layout(&self) -> ReportLayout {
        match self.variant {
            Variant::Serial => ReportLayout::ErrorBounds,
            _ => ReportLayout::Feed,
        }
    }

    pub const fn addressing(&self) -> Addressing {
        match self.variant {
            Variant::Serial => Addressing::None,
            Variant::Ethernet => Addressing::HostPort,
            Variant::Poe | Variant::Yun => Addressing::Url,
        }
    }

    /// Whether this variant has a network interface (HTTP + remote push).
    pub const fn is_networked(&self) -> bool {
        !matches!(self.variant, Variant::Serial)
    }
}

impl Default for BuildProfile {
    fn default() -> Self {
        Self::selected()
    }
}
