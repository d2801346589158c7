//! HTTP reverse-geocoding client for tagbridge.
//!
//! Implements [`tagbridge_core::location::Geocoder`] against a Google-style
//! geocoding endpoint: `GET {endpoint}?latlng={lat},{lng}&key={key}`. The
//! response decoding lives in [`parse`] as pure functions. No retry and no
//! timeout policy — a failure or hang belongs to the one request pipeline
//! that awaited it.

pub mod error;
mod parse;

use serde::Deserialize;
use tagbridge_core::location::{Geocoder, ResolvedAddress};

pub use error::{Error, Result};

/// Default endpoint of the Google Maps Geocoding API.
pub const DEFAULT_ENDPOINT: &str =
  "https://maps.googleapis.com/maps/api/geocode/json";

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeConfig {
  #[serde(default = "default_endpoint")]
  pub endpoint: String,
  pub api_key:  String,
}

fn default_endpoint() -> String { DEFAULT_ENDPOINT.to_owned() }

impl GeocodeConfig {
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      endpoint: default_endpoint(),
      api_key:  api_key.into(),
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// A reverse geocoder over HTTP.
///
/// Cloning is cheap — the inner HTTP client is reference-counted.
#[derive(Clone)]
pub struct HttpGeocoder {
  client: reqwest::Client,
  config: GeocodeConfig,
}

impl HttpGeocoder {
  pub fn new(config: GeocodeConfig) -> Self {
    Self {
      client: reqwest::Client::new(),
      config,
    }
  }
}

impl Geocoder for HttpGeocoder {
  type Error = Error;

  async fn reverse(
    &self,
    latitude: f64,
    longitude: f64,
  ) -> Result<ResolvedAddress> {
    let response = self
      .client
      .get(&self.config.endpoint)
      .query(&[("latlng", format!("{latitude},{longitude}"))])
      .query(&[("key", &self.config.api_key)])
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return Err(Error::Rejected(status.as_u16()));
    }

    parse::decode(response.json().await?)
  }
}
