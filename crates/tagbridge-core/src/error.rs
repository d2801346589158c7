//! Error types for `tagbridge-core`.
//!
//! "No match" is never an error — the matcher and both engines return it as
//! a normal value. Only collaborator failures (store transport, geocoder)
//! surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The remote tree store failed while servicing a read or write.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The reverse-geocoding collaborator failed to resolve an address.
  #[error("geocoder error: {0}")]
  Geocode(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn geocode(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Geocode(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
