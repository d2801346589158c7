//! Handlers for the `/test` echo diagnostics.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/v1/test?cellphone=…` | Echoes the cellphone back |
//! | `GET`  | `/v2/test?tagID=…`     | Echoes the tag back |

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct V1Params {
  pub cellphone: Option<String>,
}

/// `GET /v1/test[?cellphone=<number>]`
pub async fn v1<S, G>(
  State(state): State<AppState<S, G>>,
  Query(params): Query<V1Params>,
) -> Json<Value> {
  Json(json!({
    "domain": state.info.domain,
    "author": state.info.author,
    "cellphone": params.cellphone,
    "result": "ping success",
  }))
}

#[derive(Debug, Deserialize)]
pub struct V2Params {
  #[serde(rename = "tagID")]
  pub tag_id: Option<String>,
}

/// `GET /v2/test[?tagID=<tag>]`
pub async fn v2<S, G>(
  State(state): State<AppState<S, G>>,
  Query(params): Query<V2Params>,
) -> Json<Value> {
  Json(json!({
    "domain": state.info.domain,
    "author": state.info.author,
    "tagID": params.tag_id,
    "result": "ping success",
  }))
}
