//! The location reconciliation engine and the `Geocoder` trait.
//!
//! A raw telemetry report (lat/long plus the reporting device's cellphone)
//! is attributed to a device by a full snapshot scan, combined with a
//! reverse-geocoded address, and persisted as one new [`LocationEntry`]
//! under that device. At most one entry is written per call; on geocoder
//! failure the reserved slot is discarded and no address is persisted.

use std::{future::Future, sync::Arc};

use serde::Deserialize;

use crate::{
  Error, Result,
  feed::{LocationEvent, LocationFeed},
  matcher::{self, MatchResult},
  store::TreeStore,
  tree::{LocationEntry, NewLocationEntry},
};

// ─── Geocoder trait ──────────────────────────────────────────────────────────

/// A (lat, long) → postal address pair resolved by the geocoder. The
/// coordinates are the geocoder's own, which may be snapped relative to the
/// raw report.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAddress {
  pub latitude:          f64,
  pub longitude:         f64,
  pub formatted_address: String,
}

/// The reverse-geocoding collaborator.
///
/// Failures are ordinary errors on the caller's pipeline; there is no retry
/// or timeout policy here.
pub trait Geocoder: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn reverse(
    &self,
    latitude: f64,
    longitude: f64,
  ) -> impl Future<Output = Result<ResolvedAddress, Self::Error>> + Send + '_;
}

// ─── Report & outcome ────────────────────────────────────────────────────────

/// An inbound telemetry report from a GPS-enabled device.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelemetryReport {
  pub latitude:  f64,
  pub longitude: f64,
  pub cellphone: String,
}

/// Terminal result of a reconciliation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
  /// The report was attributed and persisted with a resolved address.
  Recorded(LocationEntry),
  /// No device in the snapshot carries the reporting cellphone. Nothing was
  /// written.
  UnknownCellphone,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Location reconciliation engine over a [`TreeStore`] and a [`Geocoder`].
pub struct LocationEngine<S, G> {
  store:    Arc<S>,
  geocoder: Arc<G>,
  feed:     LocationFeed,
}

impl<S: TreeStore, G: Geocoder> LocationEngine<S, G> {
  pub fn new(store: Arc<S>, geocoder: Arc<G>) -> Self {
    Self {
      store,
      geocoder,
      feed: LocationFeed::default(),
    }
  }

  /// The diagnostic feed of persisted locations.
  pub fn feed(&self) -> &LocationFeed { &self.feed }

  /// Reconcile and persist one telemetry report.
  ///
  /// Pipeline: snapshot → first-match device scan → reserve a slot →
  /// geocode → fill the slot with the resolved address and a
  /// store-assigned timestamp. Only the first matching device across the
  /// scan is used.
  pub async fn record(&self, report: TelemetryReport) -> Result<TrackOutcome> {
    let snapshot = self.store.snapshot().await.map_err(Error::store)?;

    let matched =
      match matcher::find_device_by_cellphone(&snapshot, &report.cellphone) {
        MatchResult::Found(m) => m,
        MatchResult::NotFound => return Ok(TrackOutcome::UnknownCellphone),
      };

    let slot = self
      .store
      .reserve_location(&matched.user_key, &matched.device_key)
      .await
      .map_err(Error::store)?;

    let resolved = match self
      .geocoder
      .reverse(report.latitude, report.longitude)
      .await
    {
      Ok(resolved) => resolved,
      Err(e) => {
        // Roll back the reservation; a slot with no usable address must
        // not linger in the tree.
        if let Err(discard_err) = self
          .store
          .discard_location(&matched.user_key, &matched.device_key, &slot)
          .await
        {
          tracing::warn!(
            user_key = %matched.user_key,
            device_key = %matched.device_key,
            error = %discard_err,
            "failed to discard reserved location slot"
          );
        }
        return Err(Error::geocode(e));
      }
    };

    let entry = self
      .store
      .write_location(&matched.user_key, &matched.device_key, &slot, NewLocationEntry {
        latitude:          resolved.latitude,
        longitude:         resolved.longitude,
        formatted_address: resolved.formatted_address,
      })
      .await
      .map_err(Error::store)?;

    self.feed.publish(LocationEvent {
      user_key:   matched.user_key,
      device_key: matched.device_key,
      entry:      entry.clone(),
    });

    Ok(TrackOutcome::Recorded(entry))
  }
}
