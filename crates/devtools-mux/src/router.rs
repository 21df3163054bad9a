//! Routing state shared by the command correlator and the event waiter.
//!
//! The router owns four stores:
//!
//! - pending request ids and the results that arrived for them;
//! - per-method buffers of events nobody was waiting for;
//! - the armed-wait ledger: while listeners for a method are running, the
//!   method is *armed*. The triggering event sits in the method's reserved
//!   queue, further frames for the method are appended behind it, and nested
//!   waits for the method claim from that queue before touching the buffer.
//!
//! Listener dispatch itself needs the whole client, so it lives in
//! [`crate::client`]; this module only holds the state transitions.

use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::Value;

use crate::message::Event;

#[derive(Debug, Default)]
struct ArmedWait {
    depth: usize,
    reserved: VecDeque<Event>,
}

#[derive(Debug, Default)]
pub(crate) struct Router {
    pending: HashSet<i64>,
    results: HashMap<i64, Value>,
    buffers: HashMap<String, VecDeque<Event>>,
    ledger: HashMap<String, ArmedWait>,
}

impl Router {
    pub(crate) fn mark_pending(&mut self, id: i64) {
        self.pending.insert(id);
    }

    /// Forgets a request whose caller stopped waiting.
    pub(crate) fn abandon(&mut self, id: i64) {
        self.pending.remove(&id);
        self.results.remove(&id);
    }

    /// Stores a result for a pending id; returns `false` if nobody asked.
    pub(crate) fn store_result(&mut self, id: i64, result: Value) -> bool {
        if !self.pending.remove(&id) {
            return false;
        }
        self.results.insert(id, result);
        true
    }

    pub(crate) fn take_result(&mut self, id: i64) -> Option<Value> {
        self.results.remove(&id)
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn buffer(&mut self, event: Event) {
        self.buffers
            .entry(event.method.clone())
            .or_default()
            .push_back(event);
    }

    pub(crate) fn pop_buffered(&mut self, method: &str) -> Option<Event> {
        let queue = self.buffers.get_mut(method)?;
        let event = queue.pop_front();
        if queue.is_empty() {
            self.buffers.remove(method);
        }
        event
    }

    pub(crate) fn buffered_count(&self, method: &str) -> usize {
        self.buffers.get(method).map_or(0, VecDeque::len)
    }

    /// Drops every buffered event; returns how many were discarded.
    pub(crate) fn clear_buffers(&mut self) -> usize {
        let dropped = self.buffers.values().map(VecDeque::len).sum();
        self.buffers.clear();
        dropped
    }

    pub(crate) fn is_armed(&self, method: &str) -> bool {
        self.ledger.get(method).is_some_and(|wait| wait.depth > 0)
    }

    /// Arms `event.method` and holds `event` for nested waits.
    pub(crate) fn arm(&mut self, event: Event) {
        let wait = self.ledger.entry(event.method.clone()).or_default();
        wait.depth += 1;
        wait.reserved.push_back(event);
    }

    /// Queues a frame for an armed method.
    pub(crate) fn reserve(&mut self, event: Event) {
        self.ledger
            .entry(event.method.clone())
            .or_default()
            .reserved
            .push_back(event);
    }

    /// Hands the oldest reserved frame to a nested wait.
    pub(crate) fn claim_reserved(&mut self, method: &str) -> Option<Event> {
        self.ledger
            .get_mut(method)
            .filter(|wait| wait.depth > 0)
            .and_then(|wait| wait.reserved.pop_front())
    }

    /// Leaves one level of listener dispatch.
    ///
    /// When the outermost level unwinds, the method is disarmed and every
    /// unclaimed reserved frame is returned in arrival order.
    pub(crate) fn disarm(&mut self, method: &str) -> VecDeque<Event> {
        let Some(wait) = self.ledger.get_mut(method) else {
            return VecDeque::new();
        };
        wait.depth = wait.depth.saturating_sub(1);
        if wait.depth > 0 {
            return VecDeque::new();
        }
        self.ledger
            .remove(method)
            .map(|wait| wait.reserved)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    #[fixture]
    fn router() -> Router {
        Router::default()
    }

    fn event(method: &str, seq: u64) -> Event {
        Event::new(method, json!({ "seq": seq }))
    }

    #[rstest]
    fn results_are_consumed_once(mut router: Router) {
        router.mark_pending(1);

        assert!(router.store_result(1, json!({"frameId": "f1"})));
        assert_eq!(router.take_result(1), Some(json!({"frameId": "f1"})));
        assert_eq!(router.take_result(1), None);
        assert_eq!(router.pending_count(), 0);
    }

    #[rstest]
    fn results_for_unknown_ids_are_rejected(mut router: Router) {
        assert!(!router.store_result(9, json!({})));
        assert_eq!(router.take_result(9), None);
    }

    #[rstest]
    fn abandoned_ids_reject_late_results(mut router: Router) {
        router.mark_pending(3);
        router.abandon(3);

        assert!(!router.store_result(3, json!({})));
    }

    #[rstest]
    fn buffers_are_fifo_per_method(mut router: Router) {
        router.buffer(event("A", 1));
        router.buffer(event("B", 2));
        router.buffer(event("A", 3));

        assert_eq!(router.pop_buffered("A"), Some(event("A", 1)));
        assert_eq!(router.pop_buffered("A"), Some(event("A", 3)));
        assert_eq!(router.pop_buffered("A"), None);
        assert_eq!(router.buffered_count("B"), 1);
    }

    #[rstest]
    fn clear_buffers_reports_dropped_events(mut router: Router) {
        router.buffer(event("A", 1));
        router.buffer(event("B", 2));

        assert_eq!(router.clear_buffers(), 2);
        assert_eq!(router.buffered_count("A"), 0);
    }

    #[rstest]
    fn reserved_frames_are_only_claimable_while_armed(mut router: Router) {
        assert_eq!(router.claim_reserved("A"), None);

        router.arm(event("A", 1));
        router.reserve(event("A", 2));

        assert!(router.is_armed("A"));
        assert_eq!(router.claim_reserved("A"), Some(event("A", 1)));

        let leftover = router.disarm("A");
        assert_eq!(leftover, VecDeque::from([event("A", 2)]));
        assert!(!router.is_armed("A"));
        assert_eq!(router.claim_reserved("A"), None);
    }

    #[rstest]
    fn nested_arming_unwinds_at_outermost_level(mut router: Router) {
        router.arm(event("A", 1));
        router.arm(event("A", 2));

        assert!(router.disarm("A").is_empty());
        assert!(router.is_armed("A"));
        assert_eq!(router.disarm("A").len(), 2);
    }
}
