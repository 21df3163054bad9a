//! Per-method listener lists and their cancellation handles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;

use crate::client::DevToolsClient;
use crate::errors::ClientError;

/// Callback invoked for every occurrence of an event method.
///
/// Listeners run synchronously on the thread driving the poll loop and
/// receive the client itself, so they may issue commands or wait for other
/// events before returning.
pub type Listener = dyn Fn(&mut DevToolsClient, &Value) -> Result<(), ClientError> + Send + Sync;

/// Identity of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    callback: Arc<Listener>,
}

/// Ordered listeners keyed by event method.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: HashMap<String, Vec<Registration>>,
    next_id: u64,
}

impl ListenerRegistry {
    pub(crate) fn register(&mut self, method: &str, callback: Arc<Listener>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners
            .entry(method.to_owned())
            .or_default()
            .push(Registration { id, callback });
        id
    }

    /// Removes one registration; drops the method entry once it is empty.
    pub(crate) fn remove(&mut self, method: &str, id: ListenerId) -> bool {
        let Some(registrations) = self.listeners.get_mut(method) else {
            return false;
        };
        let before = registrations.len();
        registrations.retain(|registration| registration.id != id);
        let removed = registrations.len() != before;
        if registrations.is_empty() {
            self.listeners.remove(method);
        }
        removed
    }

    /// Copies the callbacks for `method` in registration order.
    pub(crate) fn snapshot(&self, method: &str) -> Vec<Arc<Listener>> {
        self.listeners
            .get(method)
            .map(|registrations| {
                registrations
                    .iter()
                    .map(|registration| Arc::clone(&registration.callback))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, method: &str) -> usize {
        self.listeners.get(method).map_or(0, Vec::len)
    }

    #[cfg(test)]
    pub(crate) fn has_method(&self, method: &str) -> bool {
        self.listeners.contains_key(method)
    }
}

pub(crate) type SharedRegistry = Arc<Mutex<ListenerRegistry>>;

pub(crate) fn lock(registry: &Mutex<ListenerRegistry>) -> MutexGuard<'_, ListenerRegistry> {
    // A listener that panicked cannot leave the map half-updated.
    registry.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Handle returned by [`DevToolsClient::add_listener`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::cancel`] to remove it.
#[derive(Clone)]
pub struct Subscription {
    registry: Weak<Mutex<ListenerRegistry>>,
    method: String,
    id: ListenerId,
}

impl Subscription {
    pub(crate) fn new(registry: &SharedRegistry, method: &str, id: ListenerId) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            method: method.to_owned(),
            id,
        }
    }

    /// Event method the listener is registered for.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Identity of the registration.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Removes exactly this registration.
    ///
    /// Returns `false` when there was nothing to remove: the subscription was
    /// already cancelled or the client has been dropped.
    pub fn cancel(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| lock(&registry).remove(&self.method, self.id))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("method", &self.method)
            .field("id", &self.id)
            .finish()
    }
}
