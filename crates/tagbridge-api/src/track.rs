//! Handler for `GET /v1/track` — GPS telemetry ingestion.
//!
//! Requires `latitude`, `longitude` and `cellphone`; a missing or
//! non-numeric field answers `{"result":"fail"}` before any store call. A
//! persisted report answers with the literal body `ok` (the contract the
//! reporting firmware expects), an unattributable cellphone with
//! `{"result":"fail"}` and an upstream failure with `{"result":"error"}`.

use axum::{
  Json,
  extract::{Query, State},
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tagbridge_core::{
  location::{Geocoder, TelemetryReport, TrackOutcome},
  store::TreeStore,
};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TrackParams {
  pub latitude:  Option<String>,
  pub longitude: Option<String>,
  pub cellphone: Option<String>,
}

impl TrackParams {
  /// Validate and parse into a report; `None` is the cheapest-possible
  /// rejection, taken before any collaborator is touched.
  fn into_report(self) -> Option<TelemetryReport> {
    let report = TelemetryReport {
      latitude:  self.latitude?.parse().ok()?,
      longitude: self.longitude?.parse().ok()?,
      cellphone: self.cellphone?,
    };
    Some(report)
  }
}

/// `GET /v1/track?latitude=<f64>&longitude=<f64>&cellphone=<number>`
pub async fn handler<S, G>(
  State(state): State<AppState<S, G>>,
  Query(params): Query<TrackParams>,
) -> Response
where
  S: TreeStore + 'static,
  G: Geocoder + 'static,
{
  let Some(report) = params.into_report() else {
    return Json(json!({ "result": "fail" })).into_response();
  };

  match state.tracker.record(report).await {
    Ok(TrackOutcome::Recorded(_)) => "ok".into_response(),
    Ok(TrackOutcome::UnknownCellphone) => {
      Json(json!({ "result": "fail" })).into_response()
    }
    Err(e) => {
      tracing::error!(error = %e, "track pipeline failed");
      Json(json!({ "result": "error" })).into_response()
    }
  }
}
