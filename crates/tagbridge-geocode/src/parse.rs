//! Response decoding for the Google-style reverse-geocoding API. Pure
//! functions; no HTTP here.

use serde::Deserialize;
use tagbridge_core::location::ResolvedAddress;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
  status:  String,
  #[serde(default)]
  results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
  formatted_address: String,
  geometry:          Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
  location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
  lat: f64,
  lng: f64,
}

/// Take the first (most specific) result of a successful response.
pub(crate) fn decode(response: GeocodeResponse) -> Result<ResolvedAddress> {
  if response.status != "OK" {
    return Err(Error::Status(response.status));
  }
  let first = response.results.into_iter().next().ok_or(Error::NoResults)?;
  Ok(ResolvedAddress {
    latitude:          first.geometry.location.lat,
    longitude:         first.geometry.location.lng,
    formatted_address: first.formatted_address,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response(body: serde_json::Value) -> GeocodeResponse {
    serde_json::from_value(body).expect("test body should deserialise")
  }

  #[test]
  fn decodes_first_result() {
    let resolved = decode(response(serde_json::json!({
      "status": "OK",
      "results": [
        {
          "formatted_address": "221B Baker St, London NW1 6XE, UK",
          "geometry": { "location": { "lat": 51.5237, "lng": -0.1586 } }
        },
        {
          "formatted_address": "Marylebone, London, UK",
          "geometry": { "location": { "lat": 51.52, "lng": -0.16 } }
        }
      ]
    })))
    .unwrap();

    assert_eq!(resolved.formatted_address, "221B Baker St, London NW1 6XE, UK");
    assert_eq!(resolved.latitude, 51.5237);
    assert_eq!(resolved.longitude, -0.1586);
  }

  #[test]
  fn non_ok_status_is_an_error() {
    let err = decode(response(serde_json::json!({
      "status": "OVER_QUERY_LIMIT",
      "results": []
    })))
    .unwrap_err();
    assert!(matches!(err, Error::Status(s) if s == "OVER_QUERY_LIMIT"));
  }

  #[test]
  fn ok_with_empty_results_is_an_error() {
    let err = decode(response(serde_json::json!({
      "status": "OK",
      "results": []
    })))
    .unwrap_err();
    assert!(matches!(err, Error::NoResults));
  }
}
