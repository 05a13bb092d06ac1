//! The response envelope carried on `Reply` frames.
//!
//! The envelope is a tagged union: inline JSON, a blob-store path for
//! oversized payloads, null, or a client-side error. The canonical JSON
//! shape is
//!
//! ```json
//! { "ResponseType": "JsonObject|FilePath|Null|Error",
//!   "JsonData":     <any>,
//!   "FilePath":     "<opaque>",
//!   "ErrorMessage": "<string>" }
//! ```
//!
//! Field and tag matching is case-insensitive on decode; serialization
//! always emits the canonical casing.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A reply envelope from a client executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The payload fits in the frame and travels inline.
    Inline {
        /// A free JSON value.
        payload: Value,
    },
    /// The payload was diverted through the blob side-channel.
    Blob {
        /// Opaque path, meaningful to the server's blob reader only.
        path: String,
    },
    /// The executor returned nothing.
    Null,
    /// The executor failed.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl Response {
    /// Build an inline envelope.
    #[must_use]
    pub const fn inline(payload: Value) -> Self {
        Self::Inline { payload }
    }

    /// Build a blob-reference envelope.
    #[must_use]
    pub fn blob(path: impl Into<String>) -> Self {
        Self::Blob { path: path.into() }
    }

    /// Build an error envelope.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this envelope carries an inline payload.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        matches!(self, Self::Inline { .. })
    }

    /// Whether this envelope is a blob reference.
    #[must_use]
    pub const fn is_blob(&self) -> bool {
        matches!(self, Self::Blob { .. })
    }

    /// The canonical tag for this envelope kind, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Inline { .. } => "JsonObject",
            Self::Blob { .. } => "FilePath",
            Self::Null => "Null",
            Self::Error { .. } => "Error",
        }
    }

    /// Decode an envelope from a parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns `EnvelopeError` when the value is not an object, the tag
    /// is missing or unknown, or a tag-mandated field is absent.
    pub fn from_json(value: &Value) -> Result<Self, EnvelopeError> {
        let Value::Object(map) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        let field = |name: &str| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        };

        let tag = field("ResponseType")
            .and_then(Value::as_str)
            .ok_or(EnvelopeError::MissingTag)?;

        if tag.eq_ignore_ascii_case("JsonObject") {
            let payload = field("JsonData").cloned().unwrap_or(Value::Null);
            Ok(Self::Inline { payload })
        } else if tag.eq_ignore_ascii_case("FilePath") {
            let path = field("FilePath")
                .and_then(Value::as_str)
                .ok_or(EnvelopeError::MissingField("FilePath"))?;
            Ok(Self::Blob {
                path: path.to_string(),
            })
        } else if tag.eq_ignore_ascii_case("Null") {
            Ok(Self::Null)
        } else if tag.eq_ignore_ascii_case("Error") {
            let message = field("ErrorMessage")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(Self::Error {
                message: message.to_string(),
            })
        } else {
            Err(EnvelopeError::UnknownTag(tag.to_string()))
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Inline { payload } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ResponseType", "JsonObject")?;
                map.serialize_entry("JsonData", payload)?;
                map.end()
            }
            Self::Blob { path } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ResponseType", "FilePath")?;
                map.serialize_entry("FilePath", path)?;
                map.end()
            }
            Self::Null => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("ResponseType", "Null")?;
                map.end()
            }
            Self::Error { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ResponseType", "Error")?;
                map.serialize_entry("ErrorMessage", message)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(D::Error::custom)
    }
}

/// Errors produced while decoding a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// The wire value was not a JSON object.
    #[error("response envelope must be a JSON object")]
    NotAnObject,

    /// No `ResponseType` tag was present.
    #[error("response envelope is missing the ResponseType tag")]
    MissingTag,

    /// The tag value was not one of the four known kinds.
    #[error("unknown ResponseType tag: {0}")]
    UnknownTag(String),

    /// A field mandated by the tag was absent.
    #[error("response envelope is missing the {0} field")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inline_roundtrip() {
        let envelope = Response::inline(json!({"Message": "Pong"}));
        let wire = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            wire,
            json!({"ResponseType": "JsonObject", "JsonData": {"Message": "Pong"}})
        );
        let parsed: Response = serde_json::from_value(wire).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn blob_roundtrip() {
        let envelope = Response::blob("signalr-temp/Big_abc.json");
        let wire = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            wire,
            json!({"ResponseType": "FilePath", "FilePath": "signalr-temp/Big_abc.json"})
        );
        let parsed: Response = serde_json::from_value(wire).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn null_and_error_roundtrip() {
        let null: Response = serde_json::from_value(json!({"ResponseType": "Null"})).unwrap();
        assert_eq!(null, Response::Null);

        let error: Response = serde_json::from_value(
            json!({"ResponseType": "Error", "ErrorMessage": "boom"}),
        )
        .unwrap();
        assert_eq!(error, Response::error("boom"));
    }

    #[test]
    fn decode_is_case_insensitive() {
        let parsed: Response = serde_json::from_value(
            json!({"responsetype": "jsonobject", "jsondata": {"K": 1}}),
        )
        .unwrap();
        assert_eq!(parsed, Response::inline(json!({"K": 1})));

        let parsed: Response =
            serde_json::from_value(json!({"RESPONSETYPE": "FILEPATH", "filepath": "p"})).unwrap();
        assert_eq!(parsed, Response::blob("p"));
    }

    #[test]
    fn inline_without_data_decodes_as_null_payload() {
        let parsed: Response =
            serde_json::from_value(json!({"ResponseType": "JsonObject"})).unwrap();
        assert_eq!(parsed, Response::inline(Value::Null));
    }

    #[test]
    fn rejects_unknown_tag() {
        let result = Response::from_json(&json!({"ResponseType": "Stream"}));
        assert_eq!(result, Err(EnvelopeError::UnknownTag("Stream".to_string())));
    }

    #[test]
    fn rejects_missing_tag_and_non_object() {
        assert_eq!(
            Response::from_json(&json!({"JsonData": 1})),
            Err(EnvelopeError::MissingTag)
        );
        assert_eq!(
            Response::from_json(&json!([1, 2])),
            Err(EnvelopeError::NotAnObject)
        );
    }

    #[test]
    fn file_path_requires_path() {
        assert_eq!(
            Response::from_json(&json!({"ResponseType": "FilePath"})),
            Err(EnvelopeError::MissingField("FilePath"))
        );
    }
}
