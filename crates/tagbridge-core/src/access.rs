//! The access decision engine.
//!
//! Turns a scanned credential into a [`Granted`](AccessDecision::Granted) or
//! [`Denied`](AccessDecision::Denied) decision plus — on a grant — an audit
//! log append and (allow-list policy only) a device-state update. The side
//! effects are fire-and-forget: the decision is returned as soon as the
//! match is confirmed, without waiting for write acknowledgement, and a
//! failed write is logged rather than surfaced.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  matcher::{self, MatchResult},
  store::TreeStore,
  tree::NewLogEntry,
};

// ─── Decision ────────────────────────────────────────────────────────────────

/// The terminal result of an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessDecision {
  Granted,
  Denied,
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Which of the two authorization schemes to apply.
///
/// The source system carried both without stating which is authoritative, so
/// they are kept as named, independently testable policies rather than
/// merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
  /// Full scan over device-scoped allow-list entries, matching the
  /// credential against `AccessEntry.cellphone`. A grant appends to the
  /// matched device's `logs` and opens the device.
  DeviceAllowList,
  /// Indexed lookup matching the credential against the top-level
  /// `User.cardNumber`. A grant appends to the top-level `/logs` only; the
  /// device is left shut.
  CardIndex,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Authorization engine over a [`TreeStore`].
pub struct AccessEngine<S> {
  store:  Arc<S>,
  policy: AccessPolicy,
}

impl<S: TreeStore + 'static> AccessEngine<S> {
  pub fn new(store: Arc<S>, policy: AccessPolicy) -> Self {
    Self { store, policy }
  }

  pub fn policy(&self) -> AccessPolicy { self.policy }

  /// Decide whether `credential` (an RFID tag or cellphone number, per the
  /// configured policy) may enter.
  ///
  /// The decision is idempotent over an unchanged tree; the side effects
  /// are not — every grant appends a fresh audit record.
  ///
  /// Errors only on store transport failure during the match itself; a
  /// missing credential is a plain `Denied` with zero side effects.
  pub async fn authorize(&self, credential: &str) -> Result<AccessDecision> {
    match self.policy {
      AccessPolicy::DeviceAllowList => self.authorize_allow_list(credential).await,
      AccessPolicy::CardIndex => self.authorize_card_index(credential).await,
    }
  }

  async fn authorize_allow_list(&self, cellphone: &str) -> Result<AccessDecision> {
    let snapshot = self.store.snapshot().await.map_err(Error::store)?;

    let matched = match matcher::find_access_entry(&snapshot, cellphone) {
      MatchResult::Found(m) => m,
      MatchResult::NotFound => return Ok(AccessDecision::Denied),
    };

    // TODO: check card expiry once the tree carries an expiry field.

    let store = Arc::clone(&self.store);
    let entry =
      NewLogEntry::for_cellphone(&matched.entry.fullname, &matched.entry.cellphone);
    let (user_key, device_key) = (matched.user_key, matched.device_key);

    // Log first, then open, neither blocking the decision.
    tokio::spawn(async move {
      if let Err(e) = store.append_device_log(&user_key, &device_key, entry).await {
        tracing::warn!(%user_key, %device_key, error = %e, "device log append failed");
      }
      if let Err(e) = store.mark_opened(&user_key, &device_key).await {
        tracing::warn!(%user_key, %device_key, error = %e, "device open update failed");
      }
    });

    Ok(AccessDecision::Granted)
  }

  async fn authorize_card_index(&self, card: &str) -> Result<AccessDecision> {
    let matches = self
      .store
      .query_users_by_card(card)
      .await
      .map_err(Error::store)?;

    let Some((user_key, user)) = matches.into_iter().next() else {
      return Ok(AccessDecision::Denied);
    };

    let store = Arc::clone(&self.store);
    let entry = NewLogEntry::for_user(&user.fullname, user_key.as_str());

    tokio::spawn(async move {
      if let Err(e) = store.append_log(entry).await {
        tracing::warn!(%user_key, error = %e, "audit log append failed");
      }
    });

    Ok(AccessDecision::Granted)
  }
}
