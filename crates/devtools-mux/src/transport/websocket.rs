//! Blocking WebSocket transport for `ws://` debugger endpoints.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use devtools_config::{Config, DebuggerEndpoint};
use tracing::{debug, warn};
use tungstenite::{Message as Frame, WebSocket};

use super::{TRANSPORT_TARGET, Transport, TransportError};
use crate::deadline::Deadline;

/// Speaks the debugger protocol over a WebSocket, one JSON text frame per
/// message.
///
/// The read and write timeouts of the underlying socket are re-armed from
/// the caller's deadline before every read and write, so neither `receive`
/// nor `send` blocks past it.
pub struct WebSocketTransport {
    endpoint: DebuggerEndpoint,
    connect_timeout: Duration,
    socket: Option<WebSocket<TcpStream>>,
}

impl WebSocketTransport {
    /// Creates an unconnected transport.
    #[must_use]
    pub const fn new(endpoint: DebuggerEndpoint, connect_timeout: Duration) -> Self {
        Self {
            endpoint,
            connect_timeout,
            socket: None,
        }
    }

    /// Creates an unconnected transport from the shared configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.endpoint().clone(), config.connect_timeout())
    }

    /// Endpoint this transport dials.
    #[must_use]
    pub const fn endpoint(&self) -> &DebuggerEndpoint {
        &self.endpoint
    }

    /// Whether a socket is currently open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>, TransportError> {
        let host = self
            .endpoint
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']');
        let addresses: Vec<SocketAddr> = (host, self.endpoint.port()).to_socket_addrs()?.collect();
        if addresses.is_empty() {
            return Err(TransportError::InvalidEndpoint {
                endpoint: self.endpoint.to_string(),
                reason: String::from("host did not resolve to any address"),
            });
        }
        Ok(addresses)
    }

    fn open_stream(&self) -> Result<TcpStream, TransportError> {
        let mut last_error = None;
        for address in self.resolve()? {
            match TcpStream::connect_timeout(&address, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(error) => {
                    debug!(
                        target: TRANSPORT_TARGET,
                        %address,
                        error = %error,
                        "connect attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }
        Err(last_error.map_or(TransportError::NotConnected, TransportError::from))
    }

    fn socket_mut(&mut self) -> Result<&mut WebSocket<TcpStream>, TransportError> {
        self.socket.as_mut().ok_or(TransportError::NotConnected)
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.endpoint.is_secure() {
            return Err(TransportError::InvalidEndpoint {
                endpoint: self.endpoint.to_string(),
                reason: String::from("TLS endpoints are not supported"),
            });
        }

        debug!(
            target: TRANSPORT_TARGET,
            endpoint = %self.endpoint,
            "opening WebSocket connection"
        );

        let stream = self.open_stream()?;
        let handshake_timeout = (!self.connect_timeout.is_zero()).then_some(self.connect_timeout);
        stream.set_read_timeout(handshake_timeout)?;
        stream.set_write_timeout(handshake_timeout)?;
        stream.set_nodelay(true)?;

        let url = self.endpoint.to_string();
        let (socket, _response) =
            tungstenite::client(url.as_str(), stream).map_err(|error| {
                TransportError::Handshake {
                    message: error.to_string(),
                }
            })?;

        debug!(
            target: TRANSPORT_TARGET,
            endpoint = %self.endpoint,
            "WebSocket connection established"
        );
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, frame: &[u8], deadline: Deadline) -> Result<(), TransportError> {
        let text = std::str::from_utf8(frame).map_err(TransportError::Encoding)?;
        let socket = self.socket_mut()?;
        let remaining = deadline.remaining();
        if remaining.is_zero() {
            return Err(TransportError::Timeout);
        }
        socket.get_ref().set_write_timeout(Some(remaining))?;

        socket
            .send(Frame::text(text.to_owned()))
            .map_err(map_socket_error)
    }

    fn receive(&mut self, deadline: Deadline) -> Result<Vec<Vec<u8>>, TransportError> {
        let socket = self.socket_mut()?;
        let remaining = deadline.remaining();
        if remaining.is_zero() {
            return Err(TransportError::Timeout);
        }
        socket.get_ref().set_read_timeout(Some(remaining))?;

        match socket.read().map_err(map_socket_error)? {
            Frame::Text(text) => Ok(vec![text.as_bytes().to_vec()]),
            Frame::Binary(data) => Ok(vec![data.to_vec()]),
            Frame::Close(close) => {
                debug!(
                    target: TRANSPORT_TARGET,
                    frame = ?close,
                    "peer sent close frame"
                );
                Err(TransportError::Closed)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        let Some(mut socket) = self.socket.take() else {
            return Err(TransportError::NotConnected);
        };

        debug!(
            target: TRANSPORT_TARGET,
            endpoint = %self.endpoint,
            "closing WebSocket connection"
        );

        match socket.close(None).and_then(|()| socket.flush()) {
            Ok(()) => Ok(()),
            Err(error) => match map_socket_error(error) {
                TransportError::Closed => Ok(()),
                other => {
                    warn!(
                        target: TRANSPORT_TARGET,
                        endpoint = %self.endpoint,
                        error = %other,
                        "close handshake failed"
                    );
                    Err(other)
                }
            },
        }
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("endpoint", &self.endpoint.to_string())
            .field("connect_timeout", &self.connect_timeout)
            .field("connected", &self.socket.is_some())
            .finish()
    }
}

fn map_socket_error(error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        tungstenite::Error::Io(io) => TransportError::from(io),
        other => TransportError::WebSocket(Box::new(other)),
    }
}
