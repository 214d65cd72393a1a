//! Persisted device settings.
//!
//! [`Settings`] is the only long-lived state in the firmware.  It is
//! written to NVS as a postcard blob and guarded by a magic tag plus a
//! format revision: a record whose tag or revision does not match the
//! running build is treated as uninitialised and replaced by defaults.
//!
//! Every field mutation goes through [`Settings::validate`] first, then
//! [`SettingsStore::update`] applies it and persists synchronously.

use core::fmt;
use core::net::Ipv4Addr;

use heapless::String;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, StorageError, StoragePort};
use crate::config::{BuildProfile, SETTINGS_REVISION};
use crate::identity::{self, MacAddress};

/// Capacity of the magic tag.
pub const MAGIC_LEN: usize = 11;
/// Capacity of the remote API key.
pub const APIKEY_LEN: usize = 48;
/// Capacity of the remote feed URL.
pub const FEEDSURL_LEN: usize = 59;
/// Longest textual payload a command frame can carry.
pub const PAYLOAD_LEN: usize = 62;

pub const SETTINGS_NAMESPACE: &str = "energino";
pub const SETTINGS_KEY: &str = "settings";
/// Upper bound on the encoded record.
const MAX_BLOB_SIZE: usize = 256;

const DEFAULT_FEEDSURL: &str = "http://api.xively.com/v2/feeds/";

// ───────────────────────────────────────────────────────────────
// Record
// ───────────────────────────────────────────────────────────────

/// Persisted configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Layout tag of the build that wrote this record.
    pub magic: String<MAGIC_LEN>,
    /// Record format version.
    pub revision: u16,
    /// Report period (ms).
    pub period: u32,
    /// Divider top resistor (kΩ).
    pub r1: u32,
    /// Divider bottom resistor (kΩ), never 0.
    pub r2: u32,
    /// Current sensor zero-current output (mV).
    pub offset: i32,
    /// Current sensor gain (mV/A), never 0.
    pub sensitivity: u32,
    pub relaypin: u8,
    pub currentpin: u8,
    pub voltagepin: u8,
    /// Remote endpoint auth key.
    pub apikey: String<APIKEY_LEN>,
    /// Remote feed id; 0 disables remote reporting.
    pub feedid: u32,
    /// Remote feed base URL (URL-addressed variants).
    pub feedsurl: String<FEEDSURL_LEN>,
    /// Remote host (host/port-addressed variants).
    pub host: [u8; 4],
    pub port: u16,
    /// Network hardware address, generated once per unit.
    pub mac: MacAddress,
}

impl Settings {
    /// Compiled-in defaults for `profile`.
    pub fn defaults(profile: &BuildProfile, mac: MacAddress) -> Self {
        Self {
            magic: text(profile.magic()),
            revision: SETTINGS_REVISION,
            period: 2000,
            r1: 390,
            r2: 100,
            offset: 2500,
            sensitivity: 185,
            relaypin: 3,
            currentpin: 2,
            voltagepin: 1,
            apikey: String::new(),
            feedid: 0,
            feedsurl: text(DEFAULT_FEEDSURL),
            host: [216, 52, 233, 120],
            port: 80,
            mac,
        }
    }

    /// Whether the record was written by a compatible build.
    pub fn matches(&self, profile: &BuildProfile) -> bool {
        self.magic.as_str() == profile.magic() && self.revision == SETTINGS_REVISION
    }

    /// Remote reporting is on when a networked build has a non-zero feed
    /// id.  The serial variant stores feed fields but never pushes.
    pub fn remote_enabled(&self, profile: &BuildProfile) -> bool {
        profile.is_networked() && self.feedid != 0
    }

    /// Period the scheduler actually uses.
    pub fn effective_period(&self, profile: &BuildProfile) -> u32 {
        let period = if self.remote_enabled(profile) {
            self.period.max(profile.min_remote_period_ms)
        } else {
            self.period
        };
        period.max(1)
    }

    pub fn host_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.host)
    }

    /// Check a raw command value against the acceptance rule for `field`.
    ///
    /// Returns the typed value to store.  A below-floor period is raised
    /// to the floor when remote reporting is active.
    pub fn validate(
        &self,
        field: Field,
        raw: &RawValue,
        profile: &BuildProfile,
    ) -> Result<FieldValue, Rejected> {
        match field {
            Field::Period => {
                let period = non_negative_u32(raw)?;
                let period = if self.remote_enabled(profile) {
                    period.max(profile.min_remote_period_ms)
                } else {
                    period
                };
                Ok(FieldValue::Period(period))
            }
            Field::R1 => Ok(FieldValue::R1(non_negative_u32(raw)?)),
            Field::R2 => Ok(FieldValue::R2(divisor(raw)?)),
            Field::Offset => {
                let v = raw.as_int()?;
                i32::try_from(v)
                    .map(FieldValue::Offset)
                    .map_err(|_| Rejected::OutOfRange)
            }
            Field::Sensitivity => Ok(FieldValue::Sensitivity(divisor(raw)?)),
            Field::FeedId => Ok(FieldValue::FeedId(non_negative_u32(raw)?)),
            Field::ApiKey => bounded_text::<APIKEY_LEN>(raw).map(FieldValue::ApiKey),
            Field::FeedUrl => bounded_text::<FEEDSURL_LEN>(raw).map(FieldValue::FeedUrl),
            Field::Host => {
                let s = raw.as_text()?;
                s.trim()
                    .parse::<Ipv4Addr>()
                    .map(|ip| FieldValue::Host(ip.octets()))
                    .map_err(|_| Rejected::BadAddress)
            }
            Field::Port => {
                let v = raw.as_int()?;
                match u16::try_from(v) {
                    Ok(0) | Err(_) => Err(Rejected::OutOfRange),
                    Ok(port) => Ok(FieldValue::Port(port)),
                }
            }
        }
    }

    /// Store an already-validated value.
    pub fn apply(&mut self, value: &FieldValue, profile: &BuildProfile) {
        match value {
            FieldValue::Period(v) => self.period = *v,
            FieldValue::R1(v) => self.r1 = *v,
            FieldValue::R2(v) => self.r2 = *v,
            FieldValue::Offset(v) => self.offset = *v,
            FieldValue::Sensitivity(v) => self.sensitivity = *v,
            FieldValue::FeedId(v) => self.feedid = *v,
            FieldValue::ApiKey(v) => self.apikey = v.clone(),
            FieldValue::FeedUrl(v) => self.feedsurl = v.clone(),
            FieldValue::Host(v) => self.host = *v,
            FieldValue::Port(v) => self.port = *v,
        }
        self.normalize(profile);
    }

    /// Re-establish the period floor (e.g. after the feed was enabled).
    pub fn normalize(&mut self, profile: &BuildProfile) {
        if self.remote_enabled(profile) && self.period < profile.min_remote_period_ms {
            self.period = profile.min_remote_period_ms;
        }
    }
}

fn text<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

fn non_negative_u32(raw: &RawValue) -> Result<u32, Rejected> {
    let v = raw.as_int()?;
    if v < 0 {
        return Err(Rejected::Negative);
    }
    u32::try_from(v).map_err(|_| Rejected::OutOfRange)
}

fn divisor(raw: &RawValue) -> Result<u32, Rejected> {
    match non_negative_u32(raw)? {
        0 => Err(Rejected::ZeroDivisor),
        v => Ok(v),
    }
}

fn bounded_text<const N: usize>(raw: &RawValue) -> Result<String<N>, Rejected> {
    let s = raw.as_text()?;
    if s.len() > N {
        return Err(Rejected::TooLong);
    }
    if !s.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
        return Err(Rejected::NotPrintable);
    }
    Ok(text(s))
}

// ───────────────────────────────────────────────────────────────
// Field / value types
// ───────────────────────────────────────────────────────────────

/// Settable fields, one per command tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Period,
    R1,
    R2,
    Offset,
    Sensitivity,
    FeedId,
    ApiKey,
    FeedUrl,
    Host,
    Port,
}

/// Lexically parsed, not yet validated, command payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Int(i64),
    Text(String<PAYLOAD_LEN>),
}

impl RawValue {
    fn as_int(&self) -> Result<i64, Rejected> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::Text(_) => Err(Rejected::WrongType),
        }
    }

    fn as_text(&self) -> Result<&str, Rejected> {
        match self {
            Self::Text(s) => Ok(s.as_str()),
            Self::Int(_) => Err(Rejected::WrongType),
        }
    }
}

/// Validated value ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Period(u32),
    R1(u32),
    R2(u32),
    Offset(i32),
    Sensitivity(u32),
    FeedId(u32),
    ApiKey(String<APIKEY_LEN>),
    FeedUrl(String<FEEDSURL_LEN>),
    Host([u8; 4]),
    Port(u16),
}

/// Why a value was refused.  The previous value is always retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    Negative,
    OutOfRange,
    /// `r2` / `sensitivity` of zero would divide by zero downstream.
    ZeroDivisor,
    TooLong,
    NotPrintable,
    BadAddress,
    WrongType,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative => write!(f, "negative value"),
            Self::OutOfRange => write!(f, "value out of range"),
            Self::ZeroDivisor => write!(f, "zero divisor"),
            Self::TooLong => write!(f, "text too long"),
            Self::NotPrintable => write!(f, "non-printable text"),
            Self::BadAddress => write!(f, "not a dotted-quad address"),
            Self::WrongType => write!(f, "wrong payload type"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Store
// ───────────────────────────────────────────────────────────────

/// Owns the live [`Settings`] and its backing storage.
pub struct SettingsStore<S: StoragePort> {
    storage: S,
    profile: BuildProfile,
    current: Settings,
}

impl<S: StoragePort> SettingsStore<S> {
    /// Read the persisted record.  A missing, undecodable, or foreign
    /// record is replaced by defaults and written back.
    ///
    /// `seed` comes from a floating analog input and only matters when a
    /// fresh MAC has to be generated.
    pub fn load(storage: S, profile: BuildProfile, seed: u64) -> Self {
        let loaded = read_record(&storage);
        let mut store = Self {
            storage,
            profile,
            current: Settings::defaults(&profile, identity::generate_mac(seed)),
        };
        match loaded {
            Ok(settings) if settings.matches(&profile) => {
                info!("Settings: loaded '{}' rev {}", settings.magic, settings.revision);
                store.current = settings;
            }
            Ok(settings) => {
                warn!(
                    "Settings: foreign record '{}' rev {}, resetting",
                    settings.magic, settings.revision
                );
                store.persist();
            }
            Err(e) => {
                warn!("Settings: {}, writing defaults", e);
                store.persist();
            }
        }
        store
    }

    pub fn settings(&self) -> &Settings {
        &self.current
    }

    pub fn profile(&self) -> &BuildProfile {
        &self.profile
    }

    /// Restore compiled-in defaults and persist.  An already assigned MAC
    /// is kept so a unit's network identity survives `#R`.
    pub fn reset_to_defaults(&mut self, seed: u64) {
        let mac = if identity::is_assigned(&self.current.mac) {
            self.current.mac
        } else {
            identity::generate_mac(seed)
        };
        self.current = Settings::defaults(&self.profile, mac);
        self.persist();
    }

    /// Write the whole record.
    pub fn save(&mut self) -> Result<(), ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let bytes =
            postcard::to_slice(&self.current, &mut buf).map_err(|_| ConfigError::StorageFull)?;
        self.storage
            .write(SETTINGS_NAMESPACE, SETTINGS_KEY, bytes)
            .map_err(ConfigError::from)
    }

    /// Validate, apply and persist one field.
    pub fn update(&mut self, field: Field, raw: &RawValue) -> Result<FieldValue, Rejected> {
        let value = self.current.validate(field, raw, &self.profile)?;
        self.current.apply(&value, &self.profile);
        self.persist();
        Ok(value)
    }

    /// Access to the backing storage (diagnostics, tests).
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            warn!("Settings: save failed ({}), change kept in RAM only", e);
        }
    }
}

fn read_record<S: StoragePort>(storage: &S) -> Result<Settings, ConfigError> {
    let mut buf = [0u8; MAX_BLOB_SIZE];
    let len = storage
        .read(SETTINGS_NAMESPACE, SETTINGS_KEY, &mut buf)
        .map_err(ConfigError::from)?;
    postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Full => Self::StorageFull,
            StorageError::IoError => Self::IoError,
        }
    }
}
