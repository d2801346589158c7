//! Handler for `GET /v2/access` — the RFID/cellphone entry decision.
//!
//! `{"result":"error"}` when `tagID` is absent (no store interaction),
//! `{"result":"ok"}` on a grant, `{"result":"fail"}` on a denial,
//! `{"result":"error"}` when the store pipeline fails.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tagbridge_core::{
  access::AccessDecision, location::Geocoder, store::TreeStore,
};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AccessParams {
  #[serde(rename = "tagID")]
  pub tag_id: Option<String>,
}

/// `GET /v2/access?tagID=<credential>`
pub async fn handler<S, G>(
  State(state): State<AppState<S, G>>,
  Query(params): Query<AccessParams>,
) -> Json<Value>
where
  S: TreeStore + 'static,
  G: Geocoder + 'static,
{
  let Some(tag_id) = params.tag_id else {
    return Json(json!({ "result": "error" }));
  };

  match state.access.authorize(&tag_id).await {
    Ok(AccessDecision::Granted) => Json(json!({ "result": "ok" })),
    Ok(AccessDecision::Denied) => Json(json!({ "result": "fail" })),
    Err(e) => {
      tracing::error!(error = %e, "access pipeline failed");
      Json(json!({ "result": "error" }))
    }
  }
}
