//! Error types for `tagbridge-store-firebase`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("store rejected request ({status}): {body}")]
  Rejected { status: u16, body: String },

  #[error("cannot read service account file: {0}")]
  Io(#[from] std::io::Error),

  #[error("malformed service account file: {0}")]
  ServiceAccount(#[from] serde_json::Error),

  #[error("service account file is missing `{0}`")]
  MissingField(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
