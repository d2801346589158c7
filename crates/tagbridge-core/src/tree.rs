//! The persisted `users → device → {access, locations, logs}` tree.
//!
//! Field names mirror the document layout of the backing store
//! (`/users/{userId}/device/{deviceId}/{access,locations,logs}`), so every
//! struct serialises with the store's camelCase names. The tree is loosely
//! typed on the wire: any subtree may be absent, so collections and optional
//! identity fields all default. Timestamps are stored as epoch milliseconds,
//! assigned by the store — never by this system.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Opaque store-assigned key identifying a user. Unique across the tree.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserKey(pub String);

/// Opaque store-assigned key identifying a device within its owning user.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DeviceKey(pub String);

/// Opaque store-assigned key for a single location record under a device.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LocationKey(pub String);

macro_rules! key_impls {
  ($key:ident) => {
    impl $key {
      pub fn as_str(&self) -> &str { &self.0 }
    }

    impl fmt::Display for $key {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl From<&str> for $key {
      fn from(s: &str) -> Self { Self(s.to_owned()) }
    }

    impl From<String> for $key {
      fn from(s: String) -> Self { Self(s) }
    }
  };
}

key_impls!(UserKey);
key_impls!(DeviceKey);
key_impls!(LocationKey);

// ─── Entities ────────────────────────────────────────────────────────────────

/// A person in the tree, owning zero or more devices.
///
/// `card_number` belongs to the top-level card-index identity scheme; the
/// device-scoped allow-list scheme never reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  #[serde(default)]
  pub fullname:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub card_number: Option<String>,
  /// Devices owned by this user. The persisted node is named `device`
  /// (singular); existing deployments depend on that name.
  #[serde(default, rename = "device")]
  pub devices:     BTreeMap<DeviceKey, Device>,
}

/// A physical device (RFID lock, tracked item) owned by exactly one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub card_number:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cellphone:      Option<String>,
  #[serde(default)]
  pub opened:         bool,
  #[serde(
    default,
    with = "chrono::serde::ts_milliseconds_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub last_open_time: Option<DateTime<Utc>>,
  #[serde(default)]
  pub access:         BTreeMap<String, AccessEntry>,
  #[serde(default)]
  pub locations:      BTreeMap<LocationKey, LocationEntry>,
  #[serde(default)]
  pub logs:           BTreeMap<String, LogEntry>,
}

/// A device-scoped allow-list entry granting entry to a cellphone-identified
/// person. Distinct from the top-level `User.card_number` identity scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEntry {
  pub cellphone: String,
  pub fullname:  String,
}

/// An address-resolved position report. Append-only; written exclusively by
/// the location reconciliation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEntry {
  pub latitude:          f64,
  pub longitude:         f64,
  pub formatted_address: String,
  #[serde(with = "chrono::serde::ts_milliseconds")]
  pub created_at:        DateTime<Utc>,
}

/// Input for a location write; the store assigns key and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocationEntry {
  pub latitude:          f64,
  pub longitude:         f64,
  pub formatted_address: String,
}

/// An audit record, appended once per granted access decision. Identity is
/// carried as `userID` (card-index scheme) or `cellphone` (allow-list
/// scheme); at least one is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
  pub user:       String,
  #[serde(default, rename = "userID", skip_serializing_if = "Option::is_none")]
  pub user_id:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cellphone:  Option<String>,
  #[serde(with = "chrono::serde::ts_milliseconds")]
  pub created_at: DateTime<Utc>,
}

/// Input for a log append; the store assigns key and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLogEntry {
  pub user:      String,
  #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
  pub user_id:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cellphone: Option<String>,
}

impl NewLogEntry {
  /// Audit record for an allow-list grant, identified by cellphone.
  pub fn for_cellphone(user: impl Into<String>, cellphone: impl Into<String>) -> Self {
    Self {
      user:      user.into(),
      user_id:   None,
      cellphone: Some(cellphone.into()),
    }
  }

  /// Audit record for a card-index grant, identified by user key.
  pub fn for_user(user: impl Into<String>, user_id: impl Into<String>) -> Self {
    Self {
      user:      user.into(),
      user_id:   Some(user_id.into()),
      cellphone: None,
    }
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// An immutable point-in-time view of the whole `/users` subtree.
///
/// Iteration is ordered by key — an artefact of the store, never a semantic
/// guarantee. When duplicate credentials exist, which one a scan sees first
/// is undefined behaviour of the data set, not of this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
  pub users: BTreeMap<UserKey, User>,
}

impl Snapshot {
  pub fn new(users: BTreeMap<UserKey, User>) -> Self { Self { users } }

  pub fn get(&self, key: &UserKey) -> Option<&User> { self.users.get(key) }

  pub fn iter(&self) -> impl Iterator<Item = (&UserKey, &User)> {
    self.users.iter()
  }

  pub fn len(&self) -> usize { self.users.len() }

  pub fn is_empty(&self) -> bool { self.users.is_empty() }
}
