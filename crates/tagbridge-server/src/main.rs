//! tagbridge server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), connects to
//! the configured Firebase Realtime Database and geocoding endpoint, and
//! serves the device-bridge API over HTTP.
//!
//! The bind address comes from the `IP` and `PORT` environment variables,
//! defaulting to 127.0.0.1:5000 (with a warning when `IP` is unset), which
//! is what the hosting platform injects. Everything else comes from the
//! config file or `TAGBRIDGE_*` environment overrides.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use serde::Deserialize;
use tagbridge_api::{AppState, ServiceInfo};
use tagbridge_core::{
  access::{AccessEngine, AccessPolicy},
  location::LocationEngine,
};
use tagbridge_geocode::{GeocodeConfig, HttpGeocoder};
use tagbridge_store_firebase::{FirebaseConfig, FirebaseStore};
use tokio::net::TcpListener;
use tower_http::{
  services::{ServeDir, ServeFile},
  trace::TraceLayer,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "tagbridge device-bridge server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
struct ServerConfig {
  /// Identity echoed by the /test diagnostics.
  #[serde(default = "default_domain")]
  domain: String,
  #[serde(default = "default_author")]
  author: String,

  /// Database URL, used when no service-account file is given.
  database_url: Option<String>,
  /// Service-account JSON file carrying `databaseURL` and the secret.
  service_account_path: Option<PathBuf>,

  /// Which authorization scheme /v2/access applies.
  #[serde(default = "default_policy")]
  access_policy: AccessPolicy,

  geocode: GeocodeConfig,

  /// Directory with the static landing page.
  #[serde(default = "default_static_dir")]
  static_dir: PathBuf,
}

fn default_domain() -> String { "tagbridge".to_owned() }
fn default_author() -> String { "keith.io".to_owned() }
fn default_policy() -> AccessPolicy { AccessPolicy::DeviceAllowList }
fn default_static_dir() -> PathBuf { PathBuf::from("static") }

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TAGBRIDGE").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Connect the collaborators.
  let firebase_cfg = match &server_cfg.service_account_path {
    Some(path) => FirebaseConfig::from_service_account(path)
      .with_context(|| format!("failed to load service account {path:?}"))?,
    None => FirebaseConfig::new(
      server_cfg
        .database_url
        .clone()
        .context("either database_url or service_account_path must be set")?,
    ),
  };
  let store = Arc::new(FirebaseStore::new(firebase_cfg));
  let geocoder = Arc::new(HttpGeocoder::new(server_cfg.geocode.clone()));

  // Build the engines and application state.
  let tracker = Arc::new(LocationEngine::new(Arc::clone(&store), geocoder));
  let state = AppState {
    access:  Arc::new(AccessEngine::new(store, server_cfg.access_policy)),
    tracker: Arc::clone(&tracker),
    info:    Arc::new(ServiceInfo {
      domain: server_cfg.domain.clone(),
      author: server_cfg.author.clone(),
    }),
  };

  // Diagnostic subscriber on the location feed (the `child_added` log).
  let mut feed = tracker.feed().subscribe();
  tokio::spawn(async move {
    use tokio::sync::broadcast::error::RecvError;
    loop {
      match feed.recv().await {
        Ok(event) => tracing::info!(
          user_key = %event.user_key,
          device_key = %event.device_key,
          address = %event.entry.formatted_address,
          "new location data added"
        ),
        Err(RecvError::Lagged(skipped)) => {
          tracing::debug!(skipped, "location feed lagged");
        }
        Err(RecvError::Closed) => break,
      }
    }
  });

  let app = tagbridge_api::router(state)
    .route_service(
      "/",
      ServeFile::new(server_cfg.static_dir.join("index.html")),
    )
    .fallback_service(ServeDir::new(&server_cfg.static_dir))
    .layer(TraceLayer::new_for_http());

  let address = bind_address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

/// `IP:PORT` from the environment, defaulting to 127.0.0.1:5000.
fn bind_address() -> String {
  let host = match std::env::var("IP") {
    Ok(ip) => ip,
    Err(_) => {
      tracing::warn!("No IP env var, using 127.0.0.1");
      "127.0.0.1".to_owned()
    }
  };
  let port = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .unwrap_or(5000);
  format!("{host}:{port}")
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to install ctrl-c handler");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    () = ctrl_c => {},
    () = terminate => {},
  }
  tracing::info!("shutdown signal received, draining");
}
