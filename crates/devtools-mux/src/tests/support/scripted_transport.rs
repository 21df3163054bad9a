//! In-memory transport replaying a fixed script of inbound batches.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::Value;

use crate::deadline::Deadline;
use crate::transport::{Transport, TransportError};

/// One scripted reaction to a `receive` call.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver these raw frames as one batch.
    Batch(Vec<Vec<u8>>),
    /// Report a transport-level timeout straight away.
    Timeout,
    /// Report that the peer closed the connection.
    Closed,
}

/// Shared view of what a [`ScriptedTransport`] saw, kept after the
/// transport moves into a client.
#[derive(Debug, Clone, Default)]
pub struct TransportRecord {
    sent: Arc<Mutex<Vec<Value>>>,
    polls: Arc<AtomicUsize>,
    disconnects: Arc<AtomicUsize>,
}

impl TransportRecord {
    /// Decoded frames sent by the client, oldest first.
    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    /// Request ids of every sent command.
    pub fn sent_ids(&self) -> Vec<i64> {
        self.sent()
            .iter()
            .filter_map(|frame| frame.get("id").and_then(Value::as_i64))
            .collect()
    }

    /// Number of `receive` calls made so far.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Number of `disconnect` calls made so far.
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

/// Transport whose inbound traffic is fixed up front.
///
/// Once the script runs dry, `receive` sleeps until the caller's deadline and
/// then reports a timeout, like an idle socket.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: VecDeque<Step>,
    record: TransportRecord,
    refuse_connect: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a batch of JSON frames.
    #[must_use]
    pub fn batch<I>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let encoded = frames
            .into_iter()
            .map(|frame| frame.to_string().into_bytes())
            .collect();
        self.script.push_back(Step::Batch(encoded));
        self
    }

    /// Queues a batch of raw, possibly malformed, frames.
    #[must_use]
    pub fn raw_batch(mut self, frames: &[&[u8]]) -> Self {
        let raw = frames.iter().map(|frame| frame.to_vec()).collect();
        self.script.push_back(Step::Batch(raw));
        self
    }

    /// Queues an arbitrary step.
    #[must_use]
    pub fn then(mut self, step: Step) -> Self {
        self.script.push_back(step);
        self
    }

    /// Makes `connect` fail.
    #[must_use]
    pub const fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// Handle for inspecting traffic after the transport is moved.
    pub fn record(&self) -> TransportRecord {
        self.record.clone()
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.refuse_connect {
            return Err(TransportError::InvalidEndpoint {
                endpoint: String::from("scripted://refused"),
                reason: String::from("connection refused by test"),
            });
        }
        Ok(())
    }

    fn send(&mut self, frame: &[u8], _deadline: Deadline) -> Result<(), TransportError> {
        let decoded: Value = serde_json::from_slice(frame).unwrap_or(Value::Null);
        self.record
            .sent
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(decoded);
        Ok(())
    }

    fn receive(&mut self, deadline: Deadline) -> Result<Vec<Vec<u8>>, TransportError> {
        self.record.polls.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(Step::Batch(frames)) => Ok(frames),
            Some(Step::Timeout) => Err(TransportError::Timeout),
            Some(Step::Closed) => Err(TransportError::Closed),
            None => {
                thread::sleep(deadline.remaining());
                Err(TransportError::Timeout)
            }
        }
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.record.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
