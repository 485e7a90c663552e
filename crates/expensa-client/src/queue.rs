//! Requests parked while a session refresh is in flight.

use std::collections::VecDeque;
use std::future::Future;

use futures::future::join_all;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::request::{ApiResponse, OutboundRequest};

/// What a waiter eventually receives.
pub type Outcome = Result<ApiResponse>;

/// A parked request and the slot its outcome is delivered to.
#[derive(Debug)]
struct Waiter {
    request: OutboundRequest,
    slot: oneshot::Sender<Outcome>,
}

/// Caller side of a parked request.
#[derive(Debug)]
pub struct WaiterHandle {
    request_id: Uuid,
    slot: oneshot::Receiver<Outcome>,
}

impl WaiterHandle {
    /// Id of the parked request.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Wait for the outcome.
    ///
    /// If the queue entry is dropped without a delivery, the waiter resolves
    /// as a refresh failure rather than hanging.
    pub async fn outcome(self) -> Outcome {
        match self.slot.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::RefreshFailed(Box::new(Error::Cancelled(
                "refresh cycle ended without delivering an outcome".to_string(),
            )))),
        }
    }
}

/// FIFO queue of parked requests.
///
/// Every entry receives exactly one outcome: draining and rejecting both
/// consume the queue.
#[derive(Debug, Default)]
pub struct RequestQueue {
    waiters: VecDeque<Waiter>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Park `request` at the back of the queue.
    pub fn enqueue(&mut self, request: OutboundRequest) -> WaiterHandle {
        let (tx, rx) = oneshot::channel();
        let request_id = request.id();
        self.waiters.push_back(Waiter { request, slot: tx });
        WaiterHandle {
            request_id,
            slot: rx,
        }
    }

    /// Release every entry, in insertion order, to `resolver` and deliver
    /// each result to its waiter.
    ///
    /// `resolver` is invoked for all entries in order before any of the
    /// returned futures is awaited; the deliveries then run concurrently and
    /// this returns once all of them have completed.
    pub async fn drain_in_order<F, Fut>(self, mut resolver: F)
    where
        F: FnMut(OutboundRequest) -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let deliveries: Vec<_> = self
            .waiters
            .into_iter()
            .map(|Waiter { request, slot }| {
                let request_id = request.id();
                let pending = resolver(request);
                async move {
                    if slot.send(pending.await).is_err() {
                        tracing::trace!(%request_id, "Waiter went away before delivery");
                    }
                }
            })
            .collect();

        join_all(deliveries).await;
    }

    /// Deliver `failure` to every entry, in insertion order.
    pub fn reject_all(self, failure: &Error) {
        for Waiter { request, slot } in self.waiters {
            if slot.send(Err(failure.clone())).is_err() {
                tracing::trace!(request_id = %request.id(), "Waiter went away before rejection");
            }
        }
    }
}
