//! Byte-oriented duplex transports.
//!
//! The client never inspects raw bytes beyond handing them to
//! [`crate::Message::decode`]; a transport only moves frames.

mod websocket;

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::deadline::Deadline;

pub use websocket::WebSocketTransport;

/// Log target for transport operations.
pub(crate) const TRANSPORT_TARGET: &str = "devtools_mux::transport";

/// A duplex connection carrying one JSON message per frame.
pub trait Transport: Send {
    /// Opens the connection.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] describing why the connection failed.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Sends one encoded message, blocking no later than `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] when the frame could not be
    /// written before the deadline, or another [`TransportError`] if the
    /// write failed.
    fn send(&mut self, frame: &[u8], deadline: Deadline) -> Result<(), TransportError>;

    /// Receives the next batch of frames, blocking no later than `deadline`.
    ///
    /// An empty batch is valid and means the poll only advanced time (for
    /// example a control frame was consumed).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] when the deadline passes and
    /// [`TransportError::Closed`] when the peer has gone away.
    fn receive(&mut self, deadline: Deadline) -> Result<Vec<Vec<u8>>, TransportError>;

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the close handshake failed.
    fn disconnect(&mut self) -> Result<(), TransportError>;
}

/// Transport-layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The deadline passed before a frame was read or written.
    #[error("transport deadline elapsed")]
    Timeout,

    /// The peer closed the connection.
    #[error("connection closed")]
    Closed,

    /// The transport was used before `connect` or after `disconnect`.
    #[error("transport is not connected")]
    NotConnected,

    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),

    /// The endpoint cannot be served by this transport.
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// Endpoint text.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The WebSocket opening handshake failed.
    #[error("WebSocket handshake failed: {message}")]
    Handshake {
        /// Handshake failure description.
        message: String,
    },

    /// A WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[source] Box<tungstenite::Error>),

    /// An outgoing frame was not valid UTF-8 text.
    #[error("outgoing frame is not valid UTF-8")]
    Encoding(#[source] std::str::Utf8Error),
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(Arc::new(error)),
        }
    }
}
