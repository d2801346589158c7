//! Broadcast feed of newly persisted locations.
//!
//! The location engine publishes one event per successful write. Subscribers
//! are purely diagnostic — the server attaches one that logs each arrival,
//! the equivalent of a `child_added` listener on the locations node — and
//! can never affect an engine result. The feed is owned by the engine and
//! handed to subscribers explicitly; there is no ambient global.

use tokio::sync::broadcast;

use crate::tree::{DeviceKey, LocationEntry, UserKey};

/// A location record that has just been persisted under a device.
#[derive(Debug, Clone)]
pub struct LocationEvent {
  pub user_key:   UserKey,
  pub device_key: DeviceKey,
  pub entry:      LocationEntry,
}

/// Fan-out channel for [`LocationEvent`]s.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Debug, Clone)]
pub struct LocationFeed {
  tx: broadcast::Sender<LocationEvent>,
}

impl LocationFeed {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<LocationEvent> {
    self.tx.subscribe()
  }

  /// Publish an event. Never fails: with no live subscribers the event is
  /// simply dropped, and a lagging subscriber loses old events, not new
  /// ones.
  pub(crate) fn publish(&self, event: LocationEvent) {
    let _ = self.tx.send(event);
  }
}

impl Default for LocationFeed {
  fn default() -> Self { Self::new(16) }
}
