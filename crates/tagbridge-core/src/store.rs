//! The `TreeStore` trait — the remote tree store as the core sees it.
//!
//! The backing store exposes four primitives: one-shot snapshot reads,
//! indexed field queries, appends with server-assigned keys and timestamps,
//! and partial overwrites. This trait projects them as typed operations on
//! the user/device tree so the engines never touch raw paths.
//!
//! All operations are asynchronous and carry no retry, timeout or
//! cancellation policy: a hung collaborator hangs only the one request
//! pipeline awaiting it. Failures surface as the associated error type,
//! never as panics across the boundary.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::tree::{
  DeviceKey, LocationEntry, LocationKey, NewLocationEntry, NewLogEntry,
  Snapshot, User, UserKey,
};

/// Abstraction over the remote tree store backend.
///
/// Writes are append/overwrite-only; nothing this trait exposes can delete a
/// user, device or log. (`discard_location` removes only a reservation made
/// by this system within the same pipeline.)
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait TreeStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// One-shot consistent read of the whole `/users` subtree.
  fn snapshot(
    &self,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + '_;

  /// Indexed read: users whose top-level `cardNumber` equals `card`.
  /// May return zero or more matches, in key order.
  fn query_users_by_card<'a>(
    &'a self,
    card: &'a str,
  ) -> impl Future<Output = Result<Vec<(UserKey, User)>, Self::Error>>
  + Send
  + 'a;

  // ── Log appends ───────────────────────────────────────────────────────

  /// Append an audit record under the top-level `/logs` node.
  /// Returns the store-generated key.
  fn append_log(
    &self,
    entry: NewLogEntry,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Append an audit record under a device's `logs` node.
  /// Returns the store-generated key.
  fn append_device_log<'a>(
    &'a self,
    user: &'a UserKey,
    device: &'a DeviceKey,
    entry: NewLogEntry,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  // ── Locations ─────────────────────────────────────────────────────────

  /// Reserve a slot under the device's `locations` node and return its key.
  /// Nothing is persisted until [`write_location`](Self::write_location).
  fn reserve_location<'a>(
    &'a self,
    user: &'a UserKey,
    device: &'a DeviceKey,
  ) -> impl Future<Output = Result<LocationKey, Self::Error>> + Send + 'a;

  /// Fill a reserved slot with resolved location data. The store assigns
  /// the `createdAt` timestamp; the stored entry is returned.
  fn write_location<'a>(
    &'a self,
    user: &'a UserKey,
    device: &'a DeviceKey,
    slot: &'a LocationKey,
    entry: NewLocationEntry,
  ) -> impl Future<Output = Result<LocationEntry, Self::Error>> + Send + 'a;

  /// Drop a reservation (and any partial write under it). Idempotent.
  fn discard_location<'a>(
    &'a self,
    user: &'a UserKey,
    device: &'a DeviceKey,
    slot: &'a LocationKey,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Device state ──────────────────────────────────────────────────────

  /// Set `opened = true` and `lastOpenTime = now` on a device. Returns the
  /// store-assigned open time.
  fn mark_opened<'a>(
    &'a self,
    user: &'a UserKey,
    device: &'a DeviceKey,
  ) -> impl Future<Output = Result<DateTime<Utc>, Self::Error>> + Send + 'a;
}
