//! [`FirebaseStore`] — the Firebase Realtime Database implementation of
//! [`TreeStore`], speaking the REST protocol over `reqwest`.
//!
//! Paths mirror the persisted layout:
//! `/users/{userId}/device/{deviceId}/{access,locations,logs}` plus the
//! top-level `/logs`. There is deliberately no retry, backoff or timeout
//! here — transport failures propagate to the engines as error results.

pub mod error;
mod wire;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tagbridge_core::{
  store::TreeStore,
  tree::{
    DeviceKey, LocationEntry, LocationKey, NewLocationEntry, NewLogEntry,
    Snapshot, User, UserKey,
  },
};
use uuid::Uuid;

pub use error::{Error, Result};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings for one database, fixed per deployment.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
  /// Base URL of the database, e.g. `https://my-app.firebaseio.com`.
  pub database_url: String,
  /// Database secret sent as the `auth` query parameter, if the database
  /// is not world-writable.
  pub auth_token:   Option<String>,
}

/// The subset of a service-account file this store reads.
#[derive(Debug, Deserialize)]
struct ServiceAccount {
  #[serde(rename = "databaseURL")]
  database_url: Option<String>,
  secret:       Option<String>,
}

impl FirebaseConfig {
  pub fn new(database_url: impl Into<String>) -> Self {
    Self {
      database_url: database_url.into(),
      auth_token:   None,
    }
  }

  pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
    self.auth_token = Some(token.into());
    self
  }

  /// Load `databaseURL` and the database secret from a service-account
  /// JSON file.
  pub fn from_service_account(path: impl AsRef<Path>) -> Result<Self> {
    let raw = std::fs::read_to_string(path)?;
    let account: ServiceAccount = serde_json::from_str(&raw)?;
    let database_url = account
      .database_url
      .ok_or(Error::MissingField("databaseURL"))?;
    Ok(Self {
      database_url,
      auth_token: account.secret,
    })
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A tree store backed by one Firebase Realtime Database.
///
/// Cloning is cheap — the inner HTTP client is reference-counted.
#[derive(Clone)]
pub struct FirebaseStore {
  client: reqwest::Client,
  config: FirebaseConfig,
}

impl FirebaseStore {
  pub fn new(config: FirebaseConfig) -> Self {
    Self {
      client: reqwest::Client::new(),
      config,
    }
  }

  fn url(&self, segments: &[&str]) -> String {
    wire::node_url(&self.config.database_url, segments)
  }

  fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.config.auth_token {
      Some(token) => request.query(&[("auth", token)]),
      None => request,
    }
  }

  /// Send a request, mapping non-2xx statuses to [`Error::Rejected`] and
  /// decoding the JSON response body.
  async fn exchange<T: DeserializeOwned>(
    &self,
    request: reqwest::RequestBuilder,
  ) -> Result<T> {
    let response = self.authed(request).send().await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(Error::Rejected {
        status: status.as_u16(),
        body,
      });
    }
    Ok(response.json().await?)
  }
}

impl TreeStore for FirebaseStore {
  type Error = Error;

  async fn snapshot(&self) -> Result<Snapshot> {
    // An empty node reads back as JSON `null`.
    let users: Option<Snapshot> =
      self.exchange(self.client.get(self.url(&["users"]))).await?;
    Ok(users.unwrap_or_default())
  }

  async fn query_users_by_card(&self, card: &str) -> Result<Vec<(UserKey, User)>> {
    // Shallow indexed filter; requires `.indexOn: cardNumber` under /users.
    let request = self
      .client
      .get(self.url(&["users"]))
      .query(&[("orderBy", "\"cardNumber\"")])
      .query(&[("equalTo", format!("\"{card}\""))]);
    let matches: Option<std::collections::BTreeMap<UserKey, User>> =
      self.exchange(request).await?;
    Ok(matches.unwrap_or_default().into_iter().collect())
  }

  async fn append_log(&self, entry: NewLogEntry) -> Result<String> {
    let request = self
      .client
      .post(self.url(&["logs"]))
      .json(&wire::log_payload(&entry));
    let ack: wire::PushAck = self.exchange(request).await?;
    Ok(ack.name)
  }

  async fn append_device_log(
    &self,
    user: &UserKey,
    device: &DeviceKey,
    entry: NewLogEntry,
  ) -> Result<String> {
    let url =
      self.url(&["users", user.as_str(), "device", device.as_str(), "logs"]);
    let request = self.client.post(url).json(&wire::log_payload(&entry));
    let ack: wire::PushAck = self.exchange(request).await?;
    Ok(ack.name)
  }

  async fn reserve_location(
    &self,
    _user: &UserKey,
    _device: &DeviceKey,
  ) -> Result<LocationKey> {
    // Like the SDK's push(): the key is minted client-side and nothing is
    // written until the slot is set.
    Ok(LocationKey(Uuid::new_v4().simple().to_string()))
  }

  async fn write_location(
    &self,
    user: &UserKey,
    device: &DeviceKey,
    slot: &LocationKey,
    entry: NewLocationEntry,
  ) -> Result<LocationEntry> {
    let url = self.url(&[
      "users",
      user.as_str(),
      "device",
      device.as_str(),
      "locations",
      slot.as_str(),
    ]);
    let request = self.client.put(url).json(&wire::location_payload(&entry));
    // The write response echoes the entry with the timestamp sentinel
    // resolved to epoch milliseconds.
    let stored: LocationEntry = self.exchange(request).await?;
    Ok(stored)
  }

  async fn discard_location(
    &self,
    user: &UserKey,
    device: &DeviceKey,
    slot: &LocationKey,
  ) -> Result<()> {
    let url = self.url(&[
      "users",
      user.as_str(),
      "device",
      device.as_str(),
      "locations",
      slot.as_str(),
    ]);
    let _: Value = self.exchange(self.client.delete(url)).await?;
    Ok(())
  }

  async fn mark_opened(
    &self,
    user: &UserKey,
    device: &DeviceKey,
  ) -> Result<DateTime<Utc>> {
    let url = self.url(&["users", user.as_str(), "device", device.as_str()]);
    let request = self.client.patch(url).json(&wire::opened_payload());
    let ack: wire::OpenedAck = self.exchange(request).await?;
    Ok(ack.last_open_time)
  }
}
