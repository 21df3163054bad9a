//! Shared fixtures for client tests.

mod scripted_transport;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use crate::client::DevToolsClient;
use crate::deadline::Deadline;
use crate::errors::ClientError;

pub use scripted_transport::{ScriptedTransport, Step, TransportRecord};

/// Budget for waits that are expected to succeed.
pub const GENEROUS: Duration = Duration::from_secs(2);

/// Budget for waits that are expected to time out.
pub const SHORT: Duration = Duration::from_millis(50);

/// Deadline for a wait that should succeed.
pub fn generous() -> Deadline {
    Deadline::after(GENEROUS)
}

/// Deadline for a wait that should time out.
pub fn short() -> Deadline {
    Deadline::after(SHORT)
}

/// Connects a client to `transport`, returning it with the traffic record.
pub fn connect(transport: ScriptedTransport) -> (DevToolsClient, TransportRecord) {
    let record = transport.record();
    let client = DevToolsClient::connect(transport).expect("scripted transport connects");
    (client, record)
}

/// A successful response frame.
pub fn response(id: i64, result: Value) -> Value {
    json!({ "id": id, "result": result })
}

/// An error response frame.
pub fn error_frame(id: i64, code: i64, message: &str) -> Value {
    json!({ "id": id, "error": { "code": code, "message": message } })
}

/// An event frame.
pub fn event(method: &str, params: Value) -> Value {
    json!({ "method": method, "params": params })
}

/// Params recorded by listeners, shared with the test body.
#[derive(Debug, Clone, Default)]
pub struct Recorded(Arc<Mutex<Vec<Value>>>);

impl Recorded {
    pub fn push(&self, value: Value) {
        self.0
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(value);
    }

    pub fn values(&self) -> Vec<Value> {
        self.0
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

/// Records each occurrence of the event it is registered for.
pub fn recording_listener(
    recorded: &Recorded,
) -> impl Fn(&mut DevToolsClient, &Value) -> Result<(), ClientError> + Send + Sync + 'static {
    let recorded = recorded.clone();
    move |_client: &mut DevToolsClient, params: &Value| -> Result<(), ClientError> {
        recorded.push(params.clone());
        Ok(())
    }
}

/// Waits for `method` from inside a listener and records what it received.
pub fn nested_waiter(
    method: &'static str,
    recorded: &Recorded,
) -> impl Fn(&mut DevToolsClient, &Value) -> Result<(), ClientError> + Send + Sync + 'static {
    let recorded = recorded.clone();
    move |client: &mut DevToolsClient, _params: &Value| -> Result<(), ClientError> {
        let params = client.await_event(generous(), method)?;
        recorded.push(params);
        Ok(())
    }
}
