//! Credential matching over a tree snapshot.
//!
//! Two strategies exist and both are kept as first-class policies:
//!
//! - **Full scan** — the functions in this module. They walk a [`Snapshot`]
//!   in key order (users, then devices, then allow-list entries) and return
//!   on the first hit. When duplicate credentials exist, which one wins is
//!   an artefact of key order; callers must not rely on it.
//! - **Indexed lookup** — [`TreeStore::query_users_by_card`], a store-side
//!   filter costing a single round trip.
//!
//! "Not found" is a normal value, never an error.
//!
//! [`TreeStore::query_users_by_card`]: crate::store::TreeStore::query_users_by_card

use crate::tree::{AccessEntry, Device, DeviceKey, Snapshot, User, UserKey};

// ─── Result type ─────────────────────────────────────────────────────────────

/// Outcome of a credential search over one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult<T> {
  Found(T),
  NotFound,
}

impl<T> MatchResult<T> {
  pub fn is_found(&self) -> bool { matches!(self, Self::Found(_)) }

  pub fn into_option(self) -> Option<T> {
    match self {
      Self::Found(m) => Some(m),
      Self::NotFound => None,
    }
  }
}

impl<T> From<Option<T>> for MatchResult<T> {
  fn from(opt: Option<T>) -> Self {
    match opt {
      Some(m) => Self::Found(m),
      None => Self::NotFound,
    }
  }
}

// ─── Match records ───────────────────────────────────────────────────────────

/// A device located by its own identity field (`cellphone`).
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceMatch {
  pub user_key:   UserKey,
  pub device_key: DeviceKey,
  pub device:     Device,
}

/// An allow-list entry located under a device's `access` node.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessMatch {
  pub user_key:   UserKey,
  pub device_key: DeviceKey,
  pub entry:      AccessEntry,
}

/// A user located by the top-level `cardNumber` identity scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct CardMatch {
  pub user_key: UserKey,
  pub user:     User,
}

// ─── Scans ───────────────────────────────────────────────────────────────────

/// Find the first device whose `cellphone` equals `cellphone`.
///
/// Used by the location reconciliation engine to attribute a telemetry
/// report. Devices with no `cellphone` field are skipped.
pub fn find_device_by_cellphone(
  snapshot: &Snapshot,
  cellphone: &str,
) -> MatchResult<DeviceMatch> {
  snapshot
    .iter()
    .flat_map(|(user_key, user)| {
      user.devices.iter().map(move |(device_key, device)| {
        (user_key, device_key, device)
      })
    })
    .find(|(_, _, device)| device.cellphone.as_deref() == Some(cellphone))
    .map(|(user_key, device_key, device)| DeviceMatch {
      user_key:   user_key.clone(),
      device_key: device_key.clone(),
      device:     device.clone(),
    })
    .into()
}

/// Find the first allow-list entry whose `cellphone` equals `cellphone`,
/// anywhere in the tree.
///
/// This is the device-scoped authorization scheme: the entry grants access
/// to the device it hangs under, regardless of the device's own identity
/// fields. Entries beyond the first hit are never inspected.
pub fn find_access_entry(
  snapshot: &Snapshot,
  cellphone: &str,
) -> MatchResult<AccessMatch> {
  for (user_key, user) in snapshot.iter() {
    for (device_key, device) in &user.devices {
      for entry in device.access.values() {
        if entry.cellphone == cellphone {
          return MatchResult::Found(AccessMatch {
            user_key:   user_key.clone(),
            device_key: device_key.clone(),
            entry:      entry.clone(),
          });
        }
      }
    }
  }
  MatchResult::NotFound
}

/// Find the first user whose top-level `cardNumber` equals `card`.
///
/// Full-scan counterpart of the indexed lookup; useful when the backend has
/// no index on `cardNumber`.
pub fn find_user_by_card(
  snapshot: &Snapshot,
  card: &str,
) -> MatchResult<CardMatch> {
  snapshot
    .iter()
    .find(|(_, user)| user.card_number.as_deref() == Some(card))
    .map(|(user_key, user)| CardMatch {
      user_key: user_key.clone(),
      user:     user.clone(),
    })
    .into()
}
