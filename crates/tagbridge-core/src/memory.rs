//! `MemoryStore` — in-process reference implementation of [`TreeStore`].
//!
//! Stands in for the remote store in engine and router tests and for local
//! runs without credentials. Users and devices are seeded by the caller,
//! mirroring the production contract: the tree is owned by the external
//! store and this system only appends logs/locations and flips device
//! state.

use std::{
  collections::BTreeMap,
  sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  store::TreeStore,
  tree::{
    Device, DeviceKey, LocationEntry, LocationKey, LogEntry, NewLocationEntry,
    NewLogEntry, Snapshot, User, UserKey,
  },
};

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("unknown user key: {0}")]
  UnknownUser(UserKey),

  #[error("unknown device key: {0}/{1}")]
  UnknownDevice(UserKey, DeviceKey),
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Inner {
  users: BTreeMap<UserKey, User>,
  /// The top-level `/logs` node used by the card-index policy.
  logs:  BTreeMap<String, LogEntry>,
}

/// An in-memory tree behind an `RwLock`. Cloning shares the tree.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn read(&self) -> RwLockReadGuard<'_, Inner> {
    self.inner.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, Inner> {
    self.inner.write().unwrap_or_else(PoisonError::into_inner)
  }

  /// Seed a user, as the external store's owner would.
  pub fn insert_user(&self, key: impl Into<UserKey>, user: User) {
    self.write().users.insert(key.into(), user);
  }

  // ── Inspection (used by tests and diagnostics) ────────────────────────

  pub fn device(&self, user: &UserKey, device: &DeviceKey) -> Option<Device> {
    self
      .read()
      .users
      .get(user)
      .and_then(|u| u.devices.get(device))
      .cloned()
  }

  /// All entries under the top-level `/logs` node, in key order.
  pub fn root_logs(&self) -> Vec<LogEntry> {
    self.read().logs.values().cloned().collect()
  }

  /// Total number of log entries anywhere in the store, root and device
  /// nodes included.
  pub fn total_log_count(&self) -> usize {
    let inner = self.read();
    let device_logs: usize = inner
      .users
      .values()
      .flat_map(|u| u.devices.values())
      .map(|d| d.logs.len())
      .sum();
    inner.logs.len() + device_logs
  }

  /// Total number of persisted location entries anywhere in the store.
  pub fn total_location_count(&self) -> usize {
    self
      .read()
      .users
      .values()
      .flat_map(|u| u.devices.values())
      .map(|d| d.locations.len())
      .sum()
  }

  fn generate_key() -> String { Uuid::new_v4().simple().to_string() }

  fn device_mut<'a>(
    inner: &'a mut Inner,
    user: &UserKey,
    device: &DeviceKey,
  ) -> Result<&'a mut Device, MemoryError> {
    let owner = inner
      .users
      .get_mut(user)
      .ok_or_else(|| MemoryError::UnknownUser(user.clone()))?;
    owner
      .devices
      .get_mut(device)
      .ok_or_else(|| MemoryError::UnknownDevice(user.clone(), device.clone()))
  }
}

impl TreeStore for MemoryStore {
  type Error = MemoryError;

  async fn snapshot(&self) -> Result<Snapshot, MemoryError> {
    Ok(Snapshot::new(self.read().users.clone()))
  }

  async fn query_users_by_card(
    &self,
    card: &str,
  ) -> Result<Vec<(UserKey, User)>, MemoryError> {
    Ok(
      self
        .read()
        .users
        .iter()
        .filter(|(_, user)| user.card_number.as_deref() == Some(card))
        .map(|(key, user)| (key.clone(), user.clone()))
        .collect(),
    )
  }

  async fn append_log(&self, entry: NewLogEntry) -> Result<String, MemoryError> {
    let key = Self::generate_key();
    let stored = LogEntry {
      user:       entry.user,
      user_id:    entry.user_id,
      cellphone:  entry.cellphone,
      created_at: Utc::now(),
    };
    self.write().logs.insert(key.clone(), stored);
    Ok(key)
  }

  async fn append_device_log(
    &self,
    user: &UserKey,
    device: &DeviceKey,
    entry: NewLogEntry,
  ) -> Result<String, MemoryError> {
    let key = Self::generate_key();
    let stored = LogEntry {
      user:       entry.user,
      user_id:    entry.user_id,
      cellphone:  entry.cellphone,
      created_at: Utc::now(),
    };
    let mut inner = self.write();
    let target = Self::device_mut(&mut inner, user, device)?;
    target.logs.insert(key.clone(), stored);
    Ok(key)
  }

  async fn reserve_location(
    &self,
    user: &UserKey,
    device: &DeviceKey,
  ) -> Result<LocationKey, MemoryError> {
    // Key is minted without writing; the slot exists once filled.
    let mut inner = self.write();
    Self::device_mut(&mut inner, user, device)?;
    Ok(LocationKey(Self::generate_key()))
  }

  async fn write_location(
    &self,
    user: &UserKey,
    device: &DeviceKey,
    slot: &LocationKey,
    entry: NewLocationEntry,
  ) -> Result<LocationEntry, MemoryError> {
    let stored = LocationEntry {
      latitude:          entry.latitude,
      longitude:         entry.longitude,
      formatted_address: entry.formatted_address,
      created_at:        Utc::now(),
    };
    let mut inner = self.write();
    let target = Self::device_mut(&mut inner, user, device)?;
    target.locations.insert(slot.clone(), stored.clone());
    Ok(stored)
  }

  async fn discard_location(
    &self,
    user: &UserKey,
    device: &DeviceKey,
    slot: &LocationKey,
  ) -> Result<(), MemoryError> {
    let mut inner = self.write();
    if let Ok(target) = Self::device_mut(&mut inner, user, device) {
      target.locations.remove(slot);
    }
    Ok(())
  }

  async fn mark_opened(
    &self,
    user: &UserKey,
    device: &DeviceKey,
  ) -> Result<DateTime<Utc>, MemoryError> {
    let now = Utc::now();
    let mut inner = self.write();
    let target = Self::device_mut(&mut inner, user, device)?;
    target.opened = true;
    target.last_open_time = Some(now);
    Ok(now)
  }
}
