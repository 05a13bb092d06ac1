//! The in-memory pending-request table.
//!
//! One completion slot per in-flight request, keyed by `RequestId`. The
//! table is the only mutable shared structure on the invoke hot path.

use std::collections::HashMap;

use backchannel_core::{RequestId, Response};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{HubError, Result};

/// The table of completion slots for in-flight requests.
#[derive(Default)]
pub struct PendingRequests {
    slots: Mutex<HashMap<RequestId, oneshot::Sender<Response>>>,
}

impl PendingRequests {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a completion slot for a fresh request ID.
    ///
    /// # Errors
    ///
    /// Returns `HubError::RequestIdCollision` if the ID is already
    /// pending. Request IDs are never reused within a correlator
    /// lifetime, so a collision is a bug, not a condition to retry.
    pub fn register(&self, request_id: RequestId) -> Result<oneshot::Receiver<Response>> {
        let (tx, rx) = oneshot::channel();
        let mut slots = self.slots.lock();
        if slots.contains_key(&request_id) {
            return Err(HubError::RequestIdCollision(request_id));
        }
        slots.insert(request_id, tx);
        Ok(rx)
    }

    /// Complete a pending request with a reply envelope.
    ///
    /// At most one completion takes effect per request ID. Returns
    /// `false` when the request is unknown or already completed; such
    /// replies are dropped.
    pub fn complete(&self, request_id: &RequestId, response: Response) -> bool {
        let slot = self.slots.lock().remove(request_id);
        match slot {
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }

    /// Remove a slot without completing it. Used on every exit path of
    /// an invoke: timeout, cancellation, and normal completion alike.
    pub fn remove(&self, request_id: &RequestId) {
        self.slots.lock().remove(request_id);
    }

    /// Number of in-flight requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no requests are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_completion_wins() {
        let pending = PendingRequests::new();
        let id = RequestId::generate();

        let rx = pending.register(id).unwrap();
        assert!(pending.complete(&id, Response::Null));
        // The slot is gone; a late reply is dropped.
        assert!(!pending.complete(&id, Response::error("late")));

        assert_eq!(rx.await.unwrap(), Response::Null);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn unknown_request_is_dropped() {
        let pending = PendingRequests::new();
        assert!(!pending.complete(&RequestId::generate(), Response::Null));
    }

    #[tokio::test]
    async fn collision_is_rejected() {
        let pending = PendingRequests::new();
        let id = RequestId::generate();

        let _rx = pending.register(id).unwrap();
        let result = pending.register(id);
        assert!(matches!(result, Err(HubError::RequestIdCollision(_))));
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn remove_clears_slot() {
        let pending = PendingRequests::new();
        let id = RequestId::generate();

        let _rx = pending.register(id).unwrap();
        pending.remove(&id);
        assert!(pending.is_empty());
        assert!(!pending.complete(&id, Response::Null));
    }

    #[tokio::test]
    async fn completion_after_receiver_dropped() {
        let pending = PendingRequests::new();
        let id = RequestId::generate();

        let rx = pending.register(id).unwrap();
        drop(rx);
        // The slot existed but the waiter is gone; send fails cleanly.
        assert!(!pending.complete(&id, Response::Null));
        assert!(pending.is_empty());
    }
}
