//! Error types surfaced by the client.

use std::fmt;

use thiserror::Error;

use crate::message::RemoteError;
use crate::transport::TransportError;

/// Operation that was blocked when a failure occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOperation {
    /// Waiting for the response to a command.
    Command {
        /// Request id assigned to the command.
        id: i64,
        /// Command method name.
        method: String,
    },
    /// Waiting for an event.
    Event {
        /// Event method name.
        method: String,
    },
}

impl fmt::Display for PendingOperation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command { id, method } => write!(formatter, "response to {method} (id {id})"),
            Self::Event { method } => write!(formatter, "event {method}"),
        }
    }
}

/// Errors returned by [`crate::DevToolsClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The remote end answered with an error object.
    #[error("remote error {code}: {message}")]
    Protocol {
        /// Remote error code.
        code: i64,
        /// Remote error message.
        message: String,
        /// Request id named by the error frame, if any.
        id: Option<i64>,
    },

    /// The deadline elapsed before the awaited message arrived.
    #[error("timed out waiting for {operation}")]
    Timeout {
        /// What the caller was waiting for.
        operation: PendingOperation,
    },

    /// The client has been closed.
    #[error("client is closed")]
    Closed,

    /// A frame matched none of the known message shapes.
    #[error("malformed message ({reason}): {payload}")]
    MalformedMessage {
        /// Why the frame was rejected.
        reason: String,
        /// The offending frame, lossily decoded as UTF-8.
        payload: String,
    },

    /// The initial connection attempt failed.
    #[error("failed to connect: {source}")]
    Connect {
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// The remote end closed the connection.
    #[error("connection closed by the remote end")]
    Disconnected,

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// Encoding params or decoding a typed result failed.
    #[error("JSON codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A listener reported a failure of its own.
    #[error("listener for {method} failed: {message}")]
    Listener {
        /// Event method the listener was registered for.
        method: String,
        /// Description supplied by the listener.
        message: String,
    },
}

impl ClientError {
    /// Builds a protocol error from a decoded remote error object.
    #[must_use]
    pub fn from_remote(error: RemoteError, id: Option<i64>) -> Self {
        Self::Protocol {
            code: error.code,
            message: error.message,
            id,
        }
    }

    /// Builds a [`ClientError::Listener`] failure.
    #[must_use]
    pub fn listener(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Listener {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Whether the error is a deadline expiry.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub(crate) fn malformed(reason: impl Into<String>, payload: &[u8]) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        }
    }

    pub(crate) fn from_transport(error: TransportError, operation: &PendingOperation) -> Self {
        match error {
            TransportError::Timeout => Self::Timeout {
                operation: operation.clone(),
            },
            TransportError::Closed => Self::Disconnected,
            other => Self::Transport(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn timeout_names_the_command() {
        let error = ClientError::from_transport(
            TransportError::Timeout,
            &PendingOperation::Command {
                id: 7,
                method: String::from("Page.navigate"),
            },
        );

        assert!(error.is_timeout());
        assert_eq!(
            error.to_string(),
            "timed out waiting for response to Page.navigate (id 7)"
        );
    }

    #[rstest]
    fn closed_transport_maps_to_disconnected() {
        let error = ClientError::from_transport(
            TransportError::Closed,
            &PendingOperation::Event {
                method: String::from("Page.loadEventFired"),
            },
        );

        assert!(matches!(error, ClientError::Disconnected));
    }

    #[rstest]
    fn malformed_keeps_payload_text() {
        let error = ClientError::malformed("neither id nor method", br#"{"foo":1}"#);

        assert_eq!(
            error.to_string(),
            r#"malformed message (neither id nor method): {"foo":1}"#
        );
    }
}
