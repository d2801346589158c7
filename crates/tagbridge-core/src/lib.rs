//! Core types and engines for the tagbridge device bridge.
//!
//! This crate owns the device-to-user resolution logic: the credential
//! matcher, the access decision engine and the location reconciliation
//! engine, all operating over point-in-time snapshots of the remote
//! user/device tree. It is deliberately free of HTTP dependencies; the
//! remote store and the geocoder enter only through the [`store::TreeStore`]
//! and [`location::Geocoder`] traits.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod error;
pub mod feed;
pub mod location;
pub mod matcher;
pub mod memory;
pub mod store;
pub mod tree;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
