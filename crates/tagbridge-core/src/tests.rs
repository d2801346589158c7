//! Engine and matcher tests against the in-memory store.

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
  Error,
  access::{AccessDecision, AccessEngine, AccessPolicy},
  location::{Geocoder, LocationEngine, ResolvedAddress, TelemetryReport, TrackOutcome},
  matcher::{self, MatchResult},
  memory::MemoryStore,
  store::TreeStore,
  tree::{AccessEntry, Device, DeviceKey, User, UserKey},
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn device_with_cellphone(cellphone: &str) -> Device {
  Device {
    cellphone: Some(cellphone.to_owned()),
    ..Device::default()
  }
}

fn access_entry(cellphone: &str, fullname: &str) -> AccessEntry {
  AccessEntry {
    cellphone: cellphone.to_owned(),
    fullname:  fullname.to_owned(),
  }
}

/// One user `u1` with one device `d1` carrying cellphone `+15551234` and an
/// allow-list entry for the same number.
fn seeded_store() -> MemoryStore {
  let store = MemoryStore::new();
  let mut device = device_with_cellphone("+15551234");
  device
    .access
    .insert("a1".to_owned(), access_entry("+15551234", "Alice Liddell"));
  store.insert_user("u1", User {
    fullname:    "Alice Liddell".to_owned(),
    card_number: Some("CARD-0001".to_owned()),
    devices:     [(DeviceKey::from("d1"), device)].into(),
  });
  store
}

/// Poll `condition` until it holds or a short deadline passes. Used for the
/// fire-and-forget side effects of the access engine.
async fn eventually(condition: impl Fn() -> bool) {
  for _ in 0..100 {
    if condition() {
      return;
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
  }
  panic!("condition not reached within deadline");
}

#[derive(Clone)]
struct FixedGeocoder(&'static str);

impl Geocoder for FixedGeocoder {
  type Error = std::convert::Infallible;

  async fn reverse(
    &self,
    latitude: f64,
    longitude: f64,
  ) -> Result<ResolvedAddress, Self::Error> {
    Ok(ResolvedAddress {
      latitude,
      longitude,
      formatted_address: self.0.to_owned(),
    })
  }
}

#[derive(Debug, Error)]
#[error("geocoder unavailable")]
struct GeocoderDown;

struct FailingGeocoder;

impl Geocoder for FailingGeocoder {
  type Error = GeocoderDown;

  async fn reverse(
    &self,
    _latitude: f64,
    _longitude: f64,
  ) -> Result<ResolvedAddress, Self::Error> {
    Err(GeocoderDown)
  }
}

// ─── Matcher ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn device_scan_finds_matching_cellphone() {
  let store = seeded_store();
  let snapshot = store.snapshot().await.unwrap();

  let result = matcher::find_device_by_cellphone(&snapshot, "+15551234");
  let matched = result.into_option().expect("device should match");
  assert_eq!(matched.user_key, UserKey::from("u1"));
  assert_eq!(matched.device_key, DeviceKey::from("d1"));
  assert_eq!(matched.device.cellphone.as_deref(), Some("+15551234"));
}

#[tokio::test]
async fn device_scan_misses_unknown_cellphone() {
  let store = seeded_store();
  let snapshot = store.snapshot().await.unwrap();

  let result = matcher::find_device_by_cellphone(&snapshot, "+19999999");
  assert_eq!(result, MatchResult::NotFound);
}

#[tokio::test]
async fn device_scan_skips_devices_without_cellphone() {
  let store = MemoryStore::new();
  store.insert_user("u1", User {
    fullname: "Bare".to_owned(),
    devices: [(DeviceKey::from("d1"), Device::default())].into(),
    ..User::default()
  });
  let snapshot = store.snapshot().await.unwrap();

  // A device with no cellphone field must never match, not even "".
  assert_eq!(
    matcher::find_device_by_cellphone(&snapshot, ""),
    MatchResult::NotFound
  );
}

#[tokio::test]
async fn access_scan_finds_allow_list_entry() {
  let store = seeded_store();
  let snapshot = store.snapshot().await.unwrap();

  let matched = matcher::find_access_entry(&snapshot, "+15551234")
    .into_option()
    .expect("allow-list entry should match");
  assert_eq!(matched.entry.fullname, "Alice Liddell");
  assert_eq!(matched.device_key, DeviceKey::from("d1"));
}

#[tokio::test]
async fn duplicate_cellphones_resolve_to_first_key_order_match() {
  let store = seeded_store();
  // A second user, keyed after u1, lists the same cellphone.
  store.insert_user("u2", User {
    fullname: "Bob".to_owned(),
    devices: [(DeviceKey::from("d9"), device_with_cellphone("+15551234"))]
      .into(),
    ..User::default()
  });
  let snapshot = store.snapshot().await.unwrap();

  let matched = matcher::find_device_by_cellphone(&snapshot, "+15551234")
    .into_option()
    .unwrap();
  // Exactly one match is produced, the first in key order.
  assert_eq!(matched.user_key, UserKey::from("u1"));
}

#[tokio::test]
async fn card_scan_matches_top_level_card_number() {
  let store = seeded_store();
  let snapshot = store.snapshot().await.unwrap();

  let matched = matcher::find_user_by_card(&snapshot, "CARD-0001")
    .into_option()
    .unwrap();
  assert_eq!(matched.user_key, UserKey::from("u1"));
  assert!(matcher::find_user_by_card(&snapshot, "CARD-9999").into_option().is_none());
}

// ─── Access engine: allow-list policy ────────────────────────────────────────

#[tokio::test]
async fn allow_list_grant_logs_and_opens_device() {
  let store = seeded_store();
  let engine =
    AccessEngine::new(Arc::new(store.clone()), AccessPolicy::DeviceAllowList);

  let decision = engine.authorize("+15551234").await.unwrap();
  assert_eq!(decision, AccessDecision::Granted);

  let user = UserKey::from("u1");
  let device_key = DeviceKey::from("d1");
  eventually(|| {
    store
      .device(&user, &device_key)
      .is_some_and(|d| d.opened && d.logs.len() == 1)
  })
  .await;

  let device = store.device(&user, &device_key).unwrap();
  assert!(device.last_open_time.is_some());
  let log = device.logs.values().next().unwrap();
  assert_eq!(log.user, "Alice Liddell");
  assert_eq!(log.cellphone.as_deref(), Some("+15551234"));
  assert_eq!(log.user_id, None);
}

#[tokio::test]
async fn allow_list_denies_unknown_credential_without_writes() {
  let store = seeded_store();
  let engine =
    AccessEngine::new(Arc::new(store.clone()), AccessPolicy::DeviceAllowList);

  let decision = engine.authorize("+19999999").await.unwrap();
  assert_eq!(decision, AccessDecision::Denied);

  // Give any (erroneous) spawned write a chance to land before asserting.
  tokio::time::sleep(Duration::from_millis(20)).await;
  assert_eq!(store.total_log_count(), 0);
  assert!(!store.device(&UserKey::from("u1"), &DeviceKey::from("d1")).unwrap().opened);
}

#[tokio::test]
async fn allow_list_decision_is_repeatable_but_side_effects_accumulate() {
  let store = seeded_store();
  let engine =
    AccessEngine::new(Arc::new(store.clone()), AccessPolicy::DeviceAllowList);

  for _ in 0..3 {
    let decision = engine.authorize("+15551234").await.unwrap();
    assert_eq!(decision, AccessDecision::Granted);
  }

  // Same decision every time, but each grant appends its own audit record.
  eventually(|| store.total_log_count() == 3).await;
}

// ─── Access engine: card-index policy ────────────────────────────────────────

#[tokio::test]
async fn card_index_grant_logs_to_root_without_opening() {
  let store = seeded_store();
  let engine =
    AccessEngine::new(Arc::new(store.clone()), AccessPolicy::CardIndex);

  let decision = engine.authorize("CARD-0001").await.unwrap();
  assert_eq!(decision, AccessDecision::Granted);

  eventually(|| store.root_logs().len() == 1).await;

  let log = &store.root_logs()[0];
  assert_eq!(log.user, "Alice Liddell");
  assert_eq!(log.user_id.as_deref(), Some("u1"));
  assert_eq!(log.cellphone, None);

  // The index variant never opens the device.
  let device = store.device(&UserKey::from("u1"), &DeviceKey::from("d1")).unwrap();
  assert!(!device.opened);
  assert!(device.logs.is_empty());
}

#[tokio::test]
async fn card_index_denies_unknown_card() {
  let store = seeded_store();
  let engine =
    AccessEngine::new(Arc::new(store.clone()), AccessPolicy::CardIndex);

  let decision = engine.authorize("CARD-9999").await.unwrap();
  assert_eq!(decision, AccessDecision::Denied);

  tokio::time::sleep(Duration::from_millis(20)).await;
  assert_eq!(store.total_log_count(), 0);
}

// ─── Location engine ─────────────────────────────────────────────────────────

fn report(cellphone: &str) -> TelemetryReport {
  TelemetryReport {
    latitude:  51.5237,
    longitude: -0.1586,
    cellphone: cellphone.to_owned(),
  }
}

#[tokio::test]
async fn record_persists_one_geocoded_entry() {
  let store = seeded_store();
  let engine = LocationEngine::new(
    Arc::new(store.clone()),
    Arc::new(FixedGeocoder("221B Baker St")),
  );

  let outcome = engine.record(report("+15551234")).await.unwrap();
  let TrackOutcome::Recorded(entry) = outcome else {
    panic!("expected a recorded entry");
  };
  assert_eq!(entry.formatted_address, "221B Baker St");
  assert_eq!(entry.latitude, 51.5237);

  let device = store.device(&UserKey::from("u1"), &DeviceKey::from("d1")).unwrap();
  assert_eq!(device.locations.len(), 1);
  let stored = device.locations.values().next().unwrap();
  assert_eq!(stored.formatted_address, "221B Baker St");
}

#[tokio::test]
async fn record_publishes_a_feed_event() {
  let store = seeded_store();
  let engine = LocationEngine::new(
    Arc::new(store),
    Arc::new(FixedGeocoder("221B Baker St")),
  );
  let mut feed = engine.feed().subscribe();

  engine.record(report("+15551234")).await.unwrap();

  let event = feed.recv().await.unwrap();
  assert_eq!(event.user_key, UserKey::from("u1"));
  assert_eq!(event.device_key, DeviceKey::from("d1"));
  assert_eq!(event.entry.formatted_address, "221B Baker St");
}

#[tokio::test]
async fn record_fails_cleanly_on_unknown_cellphone() {
  let store = seeded_store();
  let engine = LocationEngine::new(
    Arc::new(store.clone()),
    Arc::new(FixedGeocoder("anywhere")),
  );

  let outcome = engine.record(report("+19999999")).await.unwrap();
  assert_eq!(outcome, TrackOutcome::UnknownCellphone);
  assert_eq!(store.total_location_count(), 0);
}

#[tokio::test]
async fn geocoder_failure_discards_the_reservation() {
  let store = seeded_store();
  let engine =
    LocationEngine::new(Arc::new(store.clone()), Arc::new(FailingGeocoder));

  let err = engine.record(report("+15551234")).await.unwrap_err();
  assert!(matches!(err, Error::Geocode(_)));

  // No address was persisted and no half-written slot remains.
  assert_eq!(store.total_location_count(), 0);
}

#[tokio::test]
async fn record_writes_at_most_one_entry_per_call() {
  let store = seeded_store();
  // A second device on the same user also carries the cellphone; only the
  // first in key order may receive the entry.
  {
    let snapshot = store.snapshot().await.unwrap();
    let mut user = snapshot.get(&UserKey::from("u1")).unwrap().clone();
    user
      .devices
      .insert(DeviceKey::from("d2"), device_with_cellphone("+15551234"));
    store.insert_user("u1", user);
  }
  let engine = LocationEngine::new(
    Arc::new(store.clone()),
    Arc::new(FixedGeocoder("somewhere")),
  );

  engine.record(report("+15551234")).await.unwrap();

  assert_eq!(store.total_location_count(), 1);
  let d1 = store.device(&UserKey::from("u1"), &DeviceKey::from("d1")).unwrap();
  let d2 = store.device(&UserKey::from("u1"), &DeviceKey::from("d2")).unwrap();
  assert_eq!(d1.locations.len(), 1);
  assert!(d2.locations.is_empty());
}
