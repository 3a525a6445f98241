//! Response Envelope
//!
//! Every response leaving the governance layer, success or error, has the shape
//!
//! ```text
//! { statusCode, success, message, data?, timestamp, path }
//! ```
//!
//! Handlers describe their result with [`HandlerOutput`]; the response
//! normalizer middleware turns it into an [`Envelope`] once the final status
//! and request path are known.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::AppError;

/// Message used when a raw handler result carries none of its own.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Success";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub timestamp: String,
    pub path: String,
}

impl Envelope {
    /// Build a success envelope stamped with the current time.
    pub fn success(
        status: StatusCode,
        message: impl Into<String>,
        data: Option<Value>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            status_code: status.as_u16(),
            success: true,
            message: message.into(),
            data,
            timestamp: now_timestamp(),
            path: path.into(),
        }
    }

    /// Build an error envelope. Error envelopes never carry `data`.
    pub fn failure(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            success: false,
            message: message.into(),
            data: None,
            timestamp: now_timestamp(),
            path: path.into(),
        }
    }
}

/// ISO-8601 UTC timestamp with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// What a handler produced, tagged so the normalizer never has to guess
/// whether a value is already wrapped.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    Raw(Value),
    Envelope(Envelope),
}

impl HandlerOutput {
    pub fn raw(value: impl Into<Value>) -> Self {
        HandlerOutput::Raw(value.into())
    }

    /// Tag a JSON body that arrived without a tag. A body that already has
    /// every envelope field is taken as an envelope; anything else is raw.
    pub fn from_json(value: Value) -> Self {
        match serde_json::from_value::<Envelope>(value.clone()) {
            Ok(envelope) => HandlerOutput::Envelope(envelope),
            Err(_) => HandlerOutput::Raw(value),
        }
    }

    /// Serialize any handler value into a raw output.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, AppError> {
        serde_json::to_value(value)
            .map(HandlerOutput::Raw)
            .map_err(|e| AppError::Internal(format!("failed to serialize response: {}", e)))
    }

    /// The envelope this output becomes for a response with `status` on `path`.
    pub fn into_envelope(self, status: StatusCode, path: &str) -> Envelope {
        match self {
            HandlerOutput::Envelope(envelope) => envelope,
            HandlerOutput::Raw(value) => {
                let (message, data) = split_message(value);
                Envelope::success(
                    status,
                    message.unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string()),
                    data,
                    path,
                )
            }
        }
    }

    fn body(&self) -> Value {
        match self {
            HandlerOutput::Raw(value) => value.clone(),
            HandlerOutput::Envelope(envelope) => {
                serde_json::to_value(envelope).unwrap_or(Value::Null)
            }
        }
    }
}

/// Pull a `message` field out of a keyed result; the rest becomes `data`.
fn split_message(value: Value) -> (Option<String>, Option<Value>) {
    match value {
        Value::Null => (None, None),
        Value::Object(mut fields) if fields.contains_key("message") => {
            let message = fields.remove("message").map(message_text);
            let data = if fields.is_empty() {
                None
            } else {
                Some(Value::Object(fields))
            };
            (message, data)
        }
        other => (None, Some(other)),
    }
}

fn message_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Renders the raw value as the body (so the handler is usable without the
/// normalizer) and attaches the tagged output for the normalizer to pick up.
impl IntoResponse for HandlerOutput {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, Json(self.body())).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl From<Envelope> for HandlerOutput {
    fn from(envelope: Envelope) -> Self {
        HandlerOutput::Envelope(envelope)
    }
}

impl From<Map<String, Value>> for HandlerOutput {
    fn from(fields: Map<String, Value>) -> Self {
        HandlerOutput::Raw(Value::Object(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_object_becomes_data() {
        let envelope = HandlerOutput::raw(json!({"id": 7, "name": "x"}))
            .into_envelope(StatusCode::OK, "/api/users/7");

        assert_eq!(envelope.status_code, 200);
        assert!(envelope.success);
        assert_eq!(envelope.message, "Success");
        assert_eq!(envelope.data, Some(json!({"id": 7, "name": "x"})));
        assert_eq!(envelope.path, "/api/users/7");
    }

    #[test]
    fn test_message_field_is_lifted() {
        let envelope = HandlerOutput::raw(json!({"message": "Created", "id": 3}))
            .into_envelope(StatusCode::CREATED, "/api/items");

        assert_eq!(envelope.status_code, 201);
        assert_eq!(envelope.message, "Created");
        assert_eq!(envelope.data, Some(json!({"id": 3})));
    }

    #[test]
    fn test_message_only_object_has_no_data() {
        let envelope = HandlerOutput::raw(json!({"message": "Deleted"}))
            .into_envelope(StatusCode::OK, "/api/items/1");

        assert_eq!(envelope.message, "Deleted");
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_primitive_and_absent_data() {
        let primitive = HandlerOutput::raw(42).into_envelope(StatusCode::OK, "/n");
        assert_eq!(primitive.data, Some(json!(42)));
        assert_eq!(primitive.message, "Success");

        let absent = HandlerOutput::Raw(Value::Null).into_envelope(StatusCode::OK, "/n");
        assert!(absent.data.is_none());

        let list = HandlerOutput::raw(json!([1, 2])).into_envelope(StatusCode::OK, "/n");
        assert_eq!(list.data, Some(json!([1, 2])));
    }

    #[test]
    fn test_existing_envelope_is_unchanged() {
        let original = Envelope {
            status_code: 202,
            success: true,
            message: "Queued".to_string(),
            data: Some(json!({"job": 1})),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            path: "/api/jobs".to_string(),
        };

        let normalized = HandlerOutput::from(original.clone()).into_envelope(StatusCode::OK, "/other");
        assert_eq!(normalized, original);
    }

    #[test]
    fn test_untagged_json_envelope_detected() {
        let wire = json!({
            "statusCode": 200,
            "success": true,
            "message": "Pre",
            "data": {"ok": true},
            "timestamp": "2024-01-01T00:00:00.000Z",
            "path": "/p",
        });
        match HandlerOutput::from_json(wire) {
            HandlerOutput::Envelope(envelope) => {
                assert_eq!(envelope.message, "Pre");
                assert_eq!(envelope.path, "/p");
            }
            other => panic!("expected envelope, got {:?}", other),
        }

        // Missing `path`: not an envelope.
        let partial = json!({
            "statusCode": 200,
            "success": true,
            "message": "Pre",
            "timestamp": "2024-01-01T00:00:00.000Z",
        });
        assert_eq!(HandlerOutput::from_json(partial.clone()), HandlerOutput::Raw(partial));
    }

    #[test]
    fn test_wire_format() {
        let envelope = Envelope::failure(StatusCode::NOT_FOUND, "Not found", "/api/x");
        let wire = serde_json::to_value(&envelope).unwrap();

        assert_eq!(wire["statusCode"], 404);
        assert_eq!(wire["success"], false);
        assert_eq!(wire["message"], "Not found");
        assert_eq!(wire["path"], "/api/x");
        assert!(wire.get("data").is_none());
        assert!(wire["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
