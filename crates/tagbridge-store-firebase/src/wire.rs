//! URL and payload construction for the Firebase Realtime Database REST
//! protocol, kept as pure functions so the shapes are unit-testable without
//! a network.
//!
//! Server-assigned timestamps use the `{".sv":"timestamp"}` sentinel, which
//! the store resolves to epoch milliseconds and echoes back resolved in the
//! write response.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tagbridge_core::tree::{NewLocationEntry, NewLogEntry};

/// `{base}/{segments…}.json`
pub(crate) fn node_url(base: &str, segments: &[&str]) -> String {
  let mut url = base.trim_end_matches('/').to_owned();
  for segment in segments {
    url.push('/');
    url.push_str(segment);
  }
  url.push_str(".json");
  url
}

pub(crate) fn server_timestamp() -> Value {
  json!({ ".sv": "timestamp" })
}

pub(crate) fn log_payload(entry: &NewLogEntry) -> Value {
  let mut map = Map::new();
  map.insert("user".to_owned(), Value::String(entry.user.clone()));
  if let Some(user_id) = &entry.user_id {
    map.insert("userID".to_owned(), Value::String(user_id.clone()));
  }
  if let Some(cellphone) = &entry.cellphone {
    map.insert("cellphone".to_owned(), Value::String(cellphone.clone()));
  }
  map.insert("createdAt".to_owned(), server_timestamp());
  Value::Object(map)
}

pub(crate) fn location_payload(entry: &NewLocationEntry) -> Value {
  json!({
    "latitude": entry.latitude,
    "longitude": entry.longitude,
    "formattedAddress": entry.formatted_address,
    "createdAt": server_timestamp(),
  })
}

pub(crate) fn opened_payload() -> Value {
  json!({
    "opened": true,
    "lastOpenTime": server_timestamp(),
  })
}

/// Response body of a `POST` append: the store-generated child key.
#[derive(Debug, Deserialize)]
pub(crate) struct PushAck {
  pub name: String,
}

/// Response body of the device-open `PATCH`, with the sentinel resolved.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OpenedAck {
  #[serde(with = "chrono::serde::ts_milliseconds")]
  pub last_open_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn node_url_joins_segments_and_trims_trailing_slash() {
    assert_eq!(
      node_url("https://x.firebaseio.com/", &["users"]),
      "https://x.firebaseio.com/users.json"
    );
    assert_eq!(
      node_url("https://x.firebaseio.com", &["users", "u1", "device", "d1"]),
      "https://x.firebaseio.com/users/u1/device/d1.json"
    );
  }

  #[test]
  fn log_payload_carries_identity_and_timestamp_sentinel() {
    let entry = NewLogEntry::for_cellphone("Alice Liddell", "+15551234");
    assert_eq!(log_payload(&entry), json!({
      "user": "Alice Liddell",
      "cellphone": "+15551234",
      "createdAt": { ".sv": "timestamp" },
    }));

    let entry = NewLogEntry::for_user("Alice Liddell", "u1");
    assert_eq!(log_payload(&entry), json!({
      "user": "Alice Liddell",
      "userID": "u1",
      "createdAt": { ".sv": "timestamp" },
    }));
  }

  #[test]
  fn location_payload_uses_store_field_names() {
    let entry = NewLocationEntry {
      latitude:          51.5237,
      longitude:         -0.1586,
      formatted_address: "221B Baker St".to_owned(),
    };
    assert_eq!(location_payload(&entry), json!({
      "latitude": 51.5237,
      "longitude": -0.1586,
      "formattedAddress": "221B Baker St",
      "createdAt": { ".sv": "timestamp" },
    }));
  }

  #[test]
  fn opened_payload_sets_state_and_timestamp() {
    assert_eq!(opened_payload(), json!({
      "opened": true,
      "lastOpenTime": { ".sv": "timestamp" },
    }));
  }

  #[test]
  fn opened_ack_resolves_millisecond_timestamp() {
    let ack: OpenedAck =
      serde_json::from_value(json!({ "opened": true, "lastOpenTime": 1700000000000_i64 }))
        .unwrap();
    assert_eq!(ack.last_open_time.timestamp_millis(), 1_700_000_000_000);
  }
}
