//! Error types for `tagbridge-geocode`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("geocoder rejected request ({0})")]
  Rejected(u16),

  #[error("geocoder answered with status {0:?}")]
  Status(String),

  #[error("geocoder returned no results")]
  NoResults,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
