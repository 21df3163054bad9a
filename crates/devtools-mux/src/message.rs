//! Wire messages and their JSON codec.
//!
//! Inbound frames are classified into exactly one of three shapes:
//!
//! ```text
//! {"id": 3, "result": {...}}                       command success
//! {"id": 3, "error": {"code": -32000, ...}}        command failure
//! {"method": "Page.loadEventFired", "params": {}}  event
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ClientError;

/// An outgoing command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandRequest {
    /// Request id, unique per client.
    pub id: i64,
    /// Command method, e.g. `Page.navigate`.
    pub method: String,
    /// Command parameters.
    pub params: Value,
}

impl CommandRequest {
    /// Creates a request with the given id.
    #[must_use]
    pub fn new(id: i64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Encodes the request as a JSON frame.
    ///
    /// # Errors
    ///
    /// Returns the serialisation error if `params` cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Error object carried by a failed command response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// An unsolicited event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event method, e.g. `Page.loadEventFired`.
    pub method: String,
    /// Event payload; `{}` when the frame had none.
    pub params: Value,
    /// Session the event was emitted for, when the target uses flat sessions.
    pub session_id: Option<String>,
}

impl Event {
    /// Creates an event without a session id.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
            session_id: None,
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Successful command response; `result` is `{}` when omitted.
    Response {
        /// Id of the command being answered.
        id: i64,
        /// Result payload.
        result: Value,
    },
    /// Failed command response.
    Error {
        /// Id of the failed command, when the remote supplied one.
        id: Option<i64>,
        /// Error details.
        error: RemoteError,
    },
    /// Event notification.
    Event(Event),
}

#[derive(Deserialize)]
struct RawMessage {
    id: Option<i64>,
    method: Option<String>,
    params: Option<Value>,
    result: Option<Value>,
    error: Option<RemoteError>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

impl Message {
    /// Decodes a raw frame.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedMessage`] when the frame is not a JSON
    /// object, has an unreadable error object, or carries both or neither of
    /// `id` and `method`.
    pub fn decode(frame: &[u8]) -> Result<Self, ClientError> {
        let raw: RawMessage = serde_json::from_slice(frame)
            .map_err(|error| ClientError::malformed(error.to_string(), frame))?;

        if let Some(error) = raw.error {
            return Ok(Self::Error { id: raw.id, error });
        }

        match (raw.id, raw.method) {
            (Some(id), None) => Ok(Self::Response {
                id,
                result: raw.result.unwrap_or_else(empty_object),
            }),
            (None, Some(method)) => Ok(Self::Event(Event {
                method,
                params: raw.params.unwrap_or_else(empty_object),
                session_id: raw.session_id,
            })),
            (Some(_), Some(method)) => Err(ClientError::malformed(
                format!("carries both an id and method '{method}'"),
                frame,
            )),
            (None, None) => Err(ClientError::malformed("unrecognized message shape", frame)),
        }
    }

    /// Short label for the `kind` field of the router's log events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Response { .. } => "response",
            Self::Error { .. } => "error",
            Self::Event(_) => "event",
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
