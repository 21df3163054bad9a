//! The multiplexing client: command correlation, event waits and listener
//! dispatch over a single transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use devtools_config::Config;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::deadline::Deadline;
use crate::errors::{ClientError, PendingOperation};
use crate::message::{CommandRequest, Event, Message};
use crate::registry::{self, Listener, ListenerRegistry, SharedRegistry, Subscription};
use crate::router::Router;
use crate::transport::{Transport, WebSocketTransport};

/// Log target for client operations.
pub(crate) const CLIENT_TARGET: &str = "devtools_mux::client";

/// Client for a debugger endpoint speaking the DevTools JSON protocol.
///
/// Every blocking call takes `&mut self` and drives the transport itself until
/// its own message arrives. Frames meant for someone else are stored on the
/// way: results under their request id, events in per-method buffers, and
/// listeners run inline as their events are read.
///
/// Listeners receive `&mut DevToolsClient`, so they can issue commands or wait
/// for further events before returning. A listener for `M` that waits for `M`
/// is handed the very event it is being called for.
pub struct DevToolsClient {
    transport: Box<dyn Transport>,
    router: Router,
    listeners: SharedRegistry,
    last_id: i64,
    closed: bool,
}

impl DevToolsClient {
    /// Connects `transport` and wraps it in a client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] when the transport cannot connect.
    pub fn connect<T>(transport: T) -> Result<Self, ClientError>
    where
        T: Transport + 'static,
    {
        Self::connect_boxed(Box::new(transport))
    }

    /// Connects an already boxed transport.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] when the transport cannot connect.
    pub fn connect_boxed(mut transport: Box<dyn Transport>) -> Result<Self, ClientError> {
        transport
            .connect()
            .map_err(|source| ClientError::Connect { source })?;
        debug!(target: CLIENT_TARGET, "client connected");
        Ok(Self {
            transport,
            router: Router::default(),
            listeners: Arc::new(Mutex::new(ListenerRegistry::default())),
            last_id: 0,
            closed: false,
        })
    }

    /// Connects to the endpoint named by `config` over a WebSocket.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] when the endpoint is unreachable or
    /// the WebSocket handshake fails.
    pub fn connect_with_config(config: &Config) -> Result<Self, ClientError> {
        Self::connect(WebSocketTransport::from_config(config))
    }

    /// Sends `method` and blocks until its result arrives or `deadline` passes.
    ///
    /// Events and foreign responses read while waiting are routed as usual.
    /// A response that omits `result` yields an empty object.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Protocol`] when any error frame is read during the
    ///   wait, whichever request it names.
    /// - [`ClientError::Timeout`] when `deadline` passes first.
    /// - [`ClientError::Closed`] after [`Self::close`].
    /// - Transport, decoding and listener failures as they occur.
    pub fn execute_command(
        &mut self,
        deadline: Deadline,
        method: &str,
        params: Value,
    ) -> Result<Value, ClientError> {
        self.ensure_open()?;
        self.last_id += 1;
        let id = self.last_id;
        let operation = PendingOperation::Command {
            id,
            method: method.to_owned(),
        };
        let payload = CommandRequest::new(id, method, params).to_bytes()?;

        debug!(target: CLIENT_TARGET, method, id, "sending command");
        self.router.mark_pending(id);
        let outcome = self
            .transport
            .send(&payload, deadline)
            .map_err(|error| ClientError::from_transport(error, &operation))
            .and_then(|()| self.await_result(id, deadline, &operation));

        if outcome.is_err() {
            self.router.abandon(id);
        }
        outcome
    }

    /// Serialises `params`, executes `method` and deserialises its result.
    ///
    /// # Errors
    ///
    /// As [`Self::execute_command`], plus [`ClientError::Codec`] when either
    /// conversion fails.
    pub fn execute<P, R>(
        &mut self,
        deadline: Deadline,
        method: &str,
        params: &P,
    ) -> Result<R, ClientError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params_value = serde_json::to_value(params)?;
        let result = self.execute_command(deadline, method, params_value)?;
        serde_json::from_value(result).map_err(ClientError::from)
    }

    /// Returns the params of the next `method` event.
    ///
    /// An event already held for this method is returned without touching the
    /// transport, even when `deadline` has passed. Otherwise every buffered
    /// event, of any method, is discarded before waiting for fresh traffic.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Protocol`] when an error frame is read during the wait.
    /// - [`ClientError::Timeout`] when `deadline` passes first.
    /// - [`ClientError::Closed`] after [`Self::close`].
    /// - Transport, decoding and listener failures as they occur.
    pub fn await_event(&mut self, deadline: Deadline, method: &str) -> Result<Value, ClientError> {
        self.ensure_open()?;
        if let Some(event) = self
            .router
            .claim_reserved(method)
            .or_else(|| self.router.pop_buffered(method))
        {
            debug!(target: CLIENT_TARGET, method, "event already held");
            return Ok(event.params);
        }

        let dropped = self.router.clear_buffers();
        if dropped > 0 {
            debug!(
                target: CLIENT_TARGET,
                method,
                dropped,
                "discarding buffered events before waiting"
            );
        }

        let operation = PendingOperation::Event {
            method: method.to_owned(),
        };
        loop {
            let mut matched: Option<Event> = None;
            for frame in self.poll(deadline, &operation)? {
                let message = Message::decode(&frame)?;
                let armed = matched.is_none().then_some(method);
                let routed = self.handle(message, armed)?;
                if matched.is_none() {
                    matched = routed.or_else(|| self.router.claim_reserved(method));
                }
            }
            if let Some(event) = matched {
                return Ok(event.params);
            }
        }
    }

    /// Waits for `method` and deserialises its params.
    ///
    /// # Errors
    ///
    /// As [`Self::await_event`], plus [`ClientError::Codec`] when the params
    /// do not fit `T`.
    pub fn await_event_as<T>(&mut self, deadline: Deadline, method: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let params = self.await_event(deadline, method)?;
        serde_json::from_value(params).map_err(ClientError::from)
    }

    /// Registers `callback` for every future `method` event.
    ///
    /// Listeners for one method run in registration order. The registration
    /// stays in place until [`Subscription::cancel`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] after [`Self::close`].
    pub fn add_listener<F>(&self, method: &str, callback: F) -> Result<Subscription, ClientError>
    where
        F: Fn(&mut Self, &Value) -> Result<(), ClientError> + Send + Sync + 'static,
    {
        self.ensure_open()?;
        let callback: Arc<Listener> = Arc::new(callback);
        let id = registry::lock(&self.listeners).register(method, callback);
        debug!(target: CLIENT_TARGET, method, "listener registered");
        Ok(Subscription::new(&self.listeners, method, id))
    }

    /// Number of listeners currently registered for `method`.
    #[must_use]
    pub fn listener_count(&self, method: &str) -> usize {
        registry::lock(&self.listeners).count(method)
    }

    /// Number of unclaimed events held for `method`.
    #[must_use]
    pub fn buffered_events(&self, method: &str) -> usize {
        self.router.buffered_count(method)
    }

    /// Number of commands still waiting for a response.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.router.pending_count()
    }

    /// Whether [`Self::close`] has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Disconnects the transport.
    ///
    /// The client counts as closed afterwards even when the disconnect itself
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] when already closed and
    /// [`ClientError::Transport`] when the disconnect fails.
    pub fn close(&mut self) -> Result<(), ClientError> {
        self.ensure_open()?;
        self.closed = true;
        debug!(target: CLIENT_TARGET, "closing client");
        self.transport.disconnect().map_err(ClientError::Transport)
    }

    const fn ensure_open(&self) -> Result<(), ClientError> {
        if self.closed {
            Err(ClientError::Closed)
        } else {
            Ok(())
        }
    }

    fn await_result(
        &mut self,
        id: i64,
        deadline: Deadline,
        operation: &PendingOperation,
    ) -> Result<Value, ClientError> {
        loop {
            if let Some(result) = self.router.take_result(id) {
                debug!(target: CLIENT_TARGET, id, "command completed");
                return Ok(result);
            }
            for frame in self.poll(deadline, operation)? {
                let message = Message::decode(&frame)?;
                self.handle(message, None)?;
            }
        }
    }

    /// Reads one batch of raw frames, failing fast once `deadline` has passed.
    fn poll(
        &mut self,
        deadline: Deadline,
        operation: &PendingOperation,
    ) -> Result<Vec<Vec<u8>>, ClientError> {
        self.ensure_open()?;
        if deadline.has_elapsed() {
            return Err(ClientError::Timeout {
                operation: operation.clone(),
            });
        }
        let frames = self
            .transport
            .receive(deadline)
            .map_err(|error| ClientError::from_transport(error, operation))?;
        if !frames.is_empty() {
            debug!(
                target: CLIENT_TARGET,
                frames = frames.len(),
                waiting_for = %operation,
                "received batch"
            );
        }
        Ok(frames)
    }

    /// Routes one decoded message; returns the event when it is the one
    /// `armed` names.
    fn handle(
        &mut self,
        message: Message,
        armed: Option<&str>,
    ) -> Result<Option<Event>, ClientError> {
        debug!(
            target: CLIENT_TARGET,
            kind = message.kind(),
            armed = armed.unwrap_or("none"),
            "routing message"
        );
        match message {
            Message::Error { id, error } => {
                warn!(
                    target: CLIENT_TARGET,
                    id = ?id,
                    code = error.code,
                    remote_message = %error.message,
                    "remote reported an error"
                );
                if let Some(failed) = id {
                    self.router.abandon(failed);
                }
                Err(ClientError::from_remote(error, id))
            }
            Message::Response { id, result } => {
                if !self.router.store_result(id, result) {
                    warn!(
                        target: CLIENT_TARGET,
                        id,
                        "dropping response for unknown or abandoned request"
                    );
                }
                Ok(None)
            }
            Message::Event(event) => self.route_event(event, armed),
        }
    }

    fn route_event(
        &mut self,
        event: Event,
        armed: Option<&str>,
    ) -> Result<Option<Event>, ClientError> {
        if self.router.is_armed(&event.method) {
            debug!(
                target: CLIENT_TARGET,
                method = %event.method,
                "holding event for listener in progress"
            );
            self.router.reserve(event);
            return Ok(None);
        }

        let listeners = registry::lock(&self.listeners).snapshot(&event.method);
        let (routed, overflow) = if listeners.is_empty() {
            (event, VecDeque::new())
        } else {
            let method = event.method.clone();
            let mut reserved = self.dispatch(event, &listeners)?;
            let Some(front) = reserved.pop_front() else {
                debug!(
                    target: CLIENT_TARGET,
                    method = %method,
                    "event consumed by a nested wait"
                );
                return Ok(None);
            };
            (front, reserved)
        };

        let matched = if armed == Some(routed.method.as_str()) {
            Some(routed)
        } else {
            self.router.buffer(routed);
            None
        };
        for held in overflow {
            self.router.buffer(held);
        }
        Ok(matched)
    }

    /// Runs `listeners` with the event's method armed and returns whatever
    /// nested waits left unclaimed.
    fn dispatch(
        &mut self,
        event: Event,
        listeners: &[Arc<Listener>],
    ) -> Result<VecDeque<Event>, ClientError> {
        let method = event.method.clone();
        let params = event.params.clone();
        debug!(
            target: CLIENT_TARGET,
            method = %method,
            listeners = listeners.len(),
            "dispatching event"
        );

        self.router.arm(event);
        let mut outcome = Ok(());
        for listener in listeners {
            if let Err(error) = listener(self, &params) {
                outcome = Err(error);
                break;
            }
        }
        let reserved = self.router.disarm(&method);

        if let Err(error) = outcome {
            warn!(
                target: CLIENT_TARGET,
                method = %method,
                error = %error,
                "listener failed"
            );
            for held in reserved {
                self.router.buffer(held);
            }
            return Err(error);
        }
        Ok(reserved)
    }
}

impl Drop for DevToolsClient {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!(
            target: CLIENT_TARGET,
            "client dropped without close; disconnecting"
        );
        if let Err(error) = self.transport.disconnect() {
            debug!(
                target: CLIENT_TARGET,
                error = %error,
                "disconnect during drop failed"
            );
        }
    }
}

impl std::fmt::Debug for DevToolsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevToolsClient")
            .field("last_id", &self.last_id)
            .field("pending", &self.router.pending_count())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
