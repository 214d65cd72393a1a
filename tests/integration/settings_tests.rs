//! Integration tests for settings persistence across "reboots": a store
//! rebuilt over the same backing storage must see exactly what the
//! previous one wrote, and anything it cannot trust becomes defaults.

use crate::mock_hw::SharedStorage;

use energino::config::BuildProfile;
use energino::settings::{Field, RawValue, SETTINGS_KEY, SETTINGS_NAMESPACE, SettingsStore};

fn text(s: &str) -> RawValue {
    RawValue::Text(heapless::String::try_from(s).unwrap())
}

#[test]
fn every_field_survives_reboot() {
    let storage = SharedStorage::new();
    let profile = BuildProfile::poe();
    let mut store = SettingsStore::load(storage.clone(), profile, 1);

    store.update(Field::R1, &RawValue::Int(470)).unwrap();
    store.update(Field::R2, &RawValue::Int(47)).unwrap();
    store.update(Field::Offset, &RawValue::Int(-12)).unwrap();
    store.update(Field::Sensitivity, &RawValue::Int(66)).unwrap();
    store.update(Field::FeedId, &RawValue::Int(77)).unwrap();
    store.update(Field::ApiKey, &text("abcDEF123")).unwrap();
    store.update(Field::FeedUrl, &text("http://example.org:8080/feeds/")).unwrap();
    store.update(Field::Period, &RawValue::Int(9000)).unwrap();

    let reloaded = SettingsStore::load(storage.clone(), profile, 99);
    assert_eq!(reloaded.settings(), store.settings());
    assert_eq!(reloaded.settings().period, 9000);
    assert_eq!(reloaded.settings().apikey.as_str(), "abcDEF123");
}

#[test]
fn record_from_another_variant_is_replaced() {
    let storage = SharedStorage::new();
    let mut poe = SettingsStore::load(storage.clone(), BuildProfile::poe(), 1);
    poe.update(Field::R1, &RawValue::Int(1)).unwrap();

    let serial = SettingsStore::load(storage.clone(), BuildProfile::serial(), 1);
    assert_eq!(serial.settings().magic.as_str(), "Energino");
    assert_eq!(serial.settings().r1, 390);

    // The replacement was persisted.
    let again = SettingsStore::load(storage.clone(), BuildProfile::serial(), 5);
    assert_eq!(again.settings(), serial.settings());
}

#[test]
fn corrupt_blob_becomes_defaults() {
    let storage = SharedStorage::new();
    storage.poke(SETTINGS_NAMESPACE, SETTINGS_KEY, &[0xFF; 7]);
    let store = SettingsStore::load(storage.clone(), BuildProfile::serial(), 3);
    assert_eq!(store.settings().period, 2000);
    assert_ne!(storage.peek(SETTINGS_NAMESPACE, SETTINGS_KEY).unwrap(), vec![0xFF; 7]);
}

#[test]
fn rejected_update_is_not_persisted() {
    let storage = SharedStorage::new();
    let mut store = SettingsStore::load(storage.clone(), BuildProfile::ethernet(), 1);
    let writes = storage.write_count();

    assert!(store.update(Field::Port, &RawValue::Int(0)).is_err());
    assert!(store.update(Field::Port, &RawValue::Int(70_000)).is_err());
    assert!(store.update(Field::Host, &text("10.0.0")).is_err());
    assert!(store.update(Field::ApiKey, &text(&"k".repeat(49))).is_err());
    assert_eq!(storage.write_count(), writes);

    store.update(Field::Host, &text("10.0.0.9")).unwrap();
    store.update(Field::Port, &RawValue::Int(8080)).unwrap();
    let reloaded = SettingsStore::load(storage.clone(), BuildProfile::ethernet(), 1);
    assert_eq!(reloaded.settings().host, [10, 0, 0, 9]);
    assert_eq!(reloaded.settings().port, 8080);
}

#[test]
fn generated_mac_is_stable_across_reboots() {
    let storage = SharedStorage::new();
    let first = SettingsStore::load(storage.clone(), BuildProfile::yun(), 1234);
    let second = SettingsStore::load(storage.clone(), BuildProfile::yun(), 5678);
    assert_eq!(first.settings().mac, second.settings().mac);
    assert!(energino::identity::is_assigned(&first.settings().mac));
}
