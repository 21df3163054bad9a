//! Client-side multiplexer for the Chrome DevTools JSON protocol.
#![deny(missing_docs)]
//!
//! One [`DevToolsClient`] owns one duplex connection and shares it between
//! three kinds of traffic: responses to the commands it sent, events a caller
//! is explicitly waiting for, and events delivered to registered listeners.
//! The client has no background reader. Whichever call is blocked drives the
//! [`Transport`] and routes every frame it reads: results are stored under
//! their request id, unclaimed events are buffered per method, and listeners
//! run inline with a mutable handle to the client so they can issue commands
//! or wait for further events themselves.
//!
//! Every blocking call takes an absolute [`Deadline`] that is re-applied to
//! each transport poll.

mod client;
mod deadline;
mod errors;
mod message;
mod registry;
mod router;
pub mod telemetry;
pub mod transport;

pub use client::DevToolsClient;
pub use deadline::Deadline;
pub use errors::{ClientError, PendingOperation};
pub use message::{CommandRequest, Event, Message, RemoteError};
pub use registry::{Listener, ListenerId, Subscription};
pub use transport::{Transport, TransportError, WebSocketTransport};

#[cfg(test)]
mod tests;
