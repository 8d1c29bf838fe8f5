//! Structured messages and their wire encoding
//!
//! A message is a string-keyed JSON object. The bridge enforces no schema
//! beyond that; the conventional `"msg_type"` key is read only when a
//! handler asks for the default classification.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::BridgeError;

/// Envelope key carrying the message type
pub const MSG_TYPE_KEY: &str = "msg_type";

/// Kind tag the bridge reacts to
pub const TELEMETRY_KIND: &str = "telemetry";

/// A string-keyed mapping of heterogeneous values
pub type StructuredMessage = Map<String, Value>;

/// Classification returned by a handler for each inbound message
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A vehicle state update; the bridge records a telemetry sample
    Telemetry,
    /// Anything else, tagged by the handler
    Other(String),
}

impl MessageKind {
    /// Classify a message by its `"msg_type"` envelope key
    ///
    /// Messages without a string `msg_type` are `Other("")`.
    #[must_use]
    pub fn of(message: &StructuredMessage) -> Self {
        message
            .get(MSG_TYPE_KEY)
            .and_then(Value::as_str)
            .map_or_else(|| Self::Other(String::new()), Self::from)
    }

    /// Whether this kind triggers telemetry capture
    #[must_use]
    pub fn is_telemetry(&self) -> bool {
        matches!(self, Self::Telemetry)
    }

    /// The tag as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Telemetry => TELEMETRY_KIND,
            Self::Other(kind) => kind,
        }
    }
}

impl From<&str> for MessageKind {
    fn from(kind: &str) -> Self {
        if kind == TELEMETRY_KIND {
            Self::Telemetry
        } else {
            Self::Other(kind.to_string())
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turn a JSON value into a structured message
///
/// Convenient for messages built with `serde_json::json!`.
///
/// # Errors
///
/// Returns `BridgeError::Encoding` if the value is not an object.
pub fn into_message(value: Value) -> Result<StructuredMessage, BridgeError> {
    match value {
        Value::Object(message) => Ok(message),
        other => Err(BridgeError::Encoding(format!(
            "message must be a JSON object, got {other}"
        ))),
    }
}

/// Encode a message as JSON text
///
/// A `StructuredMessage` only holds finite numbers, so every message has an
/// exact encoding and decodes back to an equal message.
///
/// # Errors
///
/// Returns `BridgeError::Encoding` if the serializer fails.
pub fn encode_message(message: &StructuredMessage) -> Result<Vec<u8>, BridgeError> {
    serde_json::to_vec(message).map_err(|e| BridgeError::Encoding(e.to_string()))
}

/// Decode JSON text into a structured message
///
/// # Errors
///
/// Returns `BridgeError::Encoding` if the text is not a JSON object.
pub fn decode_message(bytes: &[u8]) -> Result<StructuredMessage, BridgeError> {
    serde_json::from_slice(bytes).map_err(|e| BridgeError::Encoding(e.to_string()))
}
