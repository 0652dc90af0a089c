//! Core data types shared by the dispatcher and adaptors
//!
//! All types use camelCase JSON serialization for wire compatibility with
//! the analytics backends.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Correlation fields attached to an event (`applicationId`, `deviceId`, ...)
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Backend-specific visitor identifiers keyed by provider (`ga`, `gs`, ...)
pub type DistinctIds = BTreeMap<String, Option<String>>;

/// Key under which the event data is nested inside the tracked payload
pub const JSON_DATA_KEY: &str = "jsonData";

/// A user account as handed to `EventLog::start`
///
/// `id` and `username` are optional here so that malformed records can be
/// represented and rejected by the dispatcher. Any extra attribute is kept
/// in `extra` and passed through to adaptors verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Account identifier (numeric ids are normalized to strings, `0` to none)
    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    /// Account username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Account email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// First-seen marker, set only when the account was just created
    ///
    /// Kept as raw JSON so timestamps, flags or strings reach adaptors as is.
    #[serde(
        rename = "$created",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<serde_json::Value>,

    /// Everything else on the record
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Create a user with the required identity fields
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            username: Some(username.into()),
            ..Default::default()
        }
    }

    /// Set the email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Mark the user as first seen at the given time (signup)
    pub fn created_at(mut self, created: impl Into<serde_json::Value>) -> Self {
        self.created = Some(created.into());
        self
    }

    /// Add an extra attribute
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// True when both `id` and `username` are present and non-empty
    pub fn is_identified(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.id) && present(&self.username)
    }

    /// True when the record carries the first-seen marker
    pub fn is_first_seen(&self) -> bool {
        self.created.is_some()
    }

    /// Flatten the record into a JSON object
    pub fn to_properties(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) if n.as_f64() == Some(0.0) => None,
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "user id must be a string or number, got {}",
                other
            )))
        }
    })
}

/// Build the payload handed to `Adaptor::track`: the context plus `jsonData`
///
/// Without event data the key is left out entirely.
pub fn track_payload(context: &Context, json_data: Option<&serde_json::Value>) -> Context {
    let mut data = context.clone();
    if let Some(json_data) = json_data {
        data.insert(JSON_DATA_KEY.to_string(), json_data.clone());
    }
    data
}

/// Format an event type the way backends display it: `[<prefix>] <type>`
pub fn prefixed_event_type(prefix: &str, event_type: &str) -> String {
    format!("[{}] {}", prefix, event_type)
}

/// Current time in Unix milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_builder() {
        let user = User::new("123", "fake")
            .with_email("fake@example.com")
            .created_at("2024-01-01T00:00:00.000Z")
            .with_attribute("hasPasswordSet", true);

        assert!(user.is_identified());
        assert!(user.is_first_seen());
        assert_eq!(user.extra["hasPasswordSet"], true);
    }

    #[test]
    fn test_user_numeric_id() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 123,
            "username": "fake",
        }))
        .unwrap();
        assert_eq!(user.id.as_deref(), Some("123"));
        assert!(user.is_identified());
    }

    #[test]
    fn test_user_rejects_object_id() {
        let result = serde_json::from_value::<User>(serde_json::json!({"id": {"a": 1}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_user_is_not_identified() {
        assert!(!User::default().is_identified());

        let blank: User =
            serde_json::from_value(serde_json::json!({"id": "", "username": "x"})).unwrap();
        assert!(!blank.is_identified());
    }

    #[test]
    fn test_created_marker_wire_name() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "1",
            "username": "u",
            "$created": "2024-01-01",
            "permissions": ["admin"],
        }))
        .unwrap();

        assert_eq!(user.created, Some(serde_json::json!("2024-01-01")));
        assert_eq!(user.extra["permissions"], serde_json::json!(["admin"]));

        let props = user.to_properties();
        assert_eq!(props["$created"], "2024-01-01");
        assert_eq!(props["permissions"], serde_json::json!(["admin"]));
        assert!(!props.contains_key("email"));
    }

    #[test]
    fn test_track_payload_merges_context() {
        let mut context = Context::new();
        context.insert("applicationId".to_string(), serde_json::json!(1));

        let data = track_payload(&context, Some(&serde_json::json!({"name": "dev"})));
        assert_eq!(data["applicationId"], 1);
        assert_eq!(data["jsonData"]["name"], "dev");
        assert!(!context.contains_key(JSON_DATA_KEY));
    }

    #[test]
    fn test_track_payload_without_data() {
        let mut context = Context::new();
        context.insert("deviceId".to_string(), serde_json::json!(7));

        let data = track_payload(&context, None);
        assert_eq!(data, context);
        assert!(!data.contains_key(JSON_DATA_KEY));
    }

    #[test]
    fn test_created_marker_keeps_any_json_type() {
        for marker in [serde_json::json!(1700000000000u64), serde_json::json!(true)] {
            let user: User = serde_json::from_value(serde_json::json!({
                "id": 1,
                "username": "u",
                "$created": marker.clone(),
            }))
            .unwrap();

            assert!(user.is_first_seen());
            assert_eq!(user.created.as_ref(), Some(&marker));
            assert_eq!(user.to_properties()["$created"], marker);
        }
    }

    #[test]
    fn test_zero_id_is_not_identified() {
        for id in [serde_json::json!(0), serde_json::json!(0.0)] {
            let user: User =
                serde_json::from_value(serde_json::json!({"id": id, "username": "u"})).unwrap();
            assert!(user.id.is_none());
            assert!(!user.is_identified());
        }
    }

    #[test]
    fn test_prefixed_event_type() {
        assert_eq!(prefixed_event_type("TEST", "Device Rename"), "[TEST] Device Rename");
    }
}
