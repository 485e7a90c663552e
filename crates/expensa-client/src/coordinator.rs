//! Session refresh coordination.
//!
//! When requests fail because the session expired, the coordinator collapses
//! them into a single refresh call and replays each request once the refresh
//! resolves.
//!
//! ```text
//!            defer(req)                       refresh ok
//!   ┌──────┐ ───────────► ┌────────────┐ ─────────────────► drain queue (FIFO),
//!   │ Idle │              │ Refreshing │                    replay each request
//!   └──────┘ ◄─────────── └────────────┘ ─────────────────► clear session,
//!              cycle ends    │    ▲        refresh failed    reject every waiter
//!                            └────┘
//!                          defer(req): enqueue only
//! ```
//!
//! The state and the queue sit behind one mutex, so the "is a refresh in
//! flight?" check and the enqueue/start decision are a single atomic step.
//! The lock is never held across an await.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use expensa_session::{Session, SessionStore};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth_backend::SharedAuthBackend;
use crate::error::{Error, Result};
use crate::queue::{Outcome, RequestQueue};
use crate::request::OutboundRequest;
use crate::transport::{SharedTransport, Transport};

/// Callback run after a failed refresh has cleared the session and before the
/// waiting requests see the failure, typically to send the user back to the
/// login surface.
pub type SessionExpiredHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// Whether a refresh is in flight.
#[derive(Debug, Default)]
enum RefreshState {
    #[default]
    Idle,
    /// The running refresh cycle.
    Refreshing(JoinHandle<()>),
}

#[derive(Debug, Default)]
struct Shared {
    state: RefreshState,
    queue: RequestQueue,
}

/// Single-flight session refresh with request replay.
pub struct RefreshCoordinator {
    shared: Mutex<Shared>,
    transport: SharedTransport,
    auth: SharedAuthBackend,
    session: Arc<SessionStore>,
    on_expired: Option<SessionExpiredHook>,
    refresh_timeout: Option<Duration>,
    refresh_count: AtomicU64,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .field("waiting", &self.waiting())
            .field("refresh_timeout", &self.refresh_timeout)
            .field("refresh_count", &self.refresh_count())
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Create an idle coordinator.
    pub fn new(
        transport: SharedTransport,
        auth: SharedAuthBackend,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            shared: Mutex::new(Shared::default()),
            transport,
            auth,
            session,
            on_expired: None,
            refresh_timeout: None,
            refresh_count: AtomicU64::new(0),
        }
    }

    /// Bound each refresh call. An elapsed refresh counts as a failed one.
    pub fn with_refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Run `hook` after a failed refresh has cleared the session.
    pub fn with_session_expired_hook(mut self, hook: Option<SessionExpiredHook>) -> Self {
        self.on_expired = hook;
        self
    }

    /// Number of refresh calls started so far.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    /// Number of requests parked on the current refresh.
    pub fn waiting(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Whether a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        matches!(self.shared.lock().state, RefreshState::Refreshing(_))
    }

    /// Park `request` until the session has been refreshed, then replay it.
    ///
    /// The first caller while idle starts the refresh; later callers join it.
    /// Resolves to the replayed response, or to the failure that ended the
    /// refresh.
    pub async fn defer(self: &Arc<Self>, request: OutboundRequest) -> Outcome {
        debug_assert!(request.is_retried());

        let handle = {
            let mut shared = self.shared.lock();
            let handle = shared.queue.enqueue(request);

            if let RefreshState::Refreshing(_) = shared.state {
                debug!(
                    request_id = %handle.request_id(),
                    waiters = shared.queue.len(),
                    "Joining in-flight session refresh"
                );
            } else {
                debug!(request_id = %handle.request_id(), "Starting session refresh");
                let cycle = tokio::spawn(Arc::clone(self).run_cycle());
                shared.state = RefreshState::Refreshing(cycle);
            }

            handle
        };

        handle.outcome().await
    }

    /// One refresh cycle: refresh, then settle every parked request.
    async fn run_cycle(self: Arc<Self>) {
        let guard = CycleGuard::new(&self);
        let count = self.refresh_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(refresh = count, "Session expired, refreshing");

        match self.call_refresh().await {
            Ok(identity) => {
                if let Some(session) = identity {
                    self.session.set(session);
                }
                let waiters = guard.finish();
                info!(waiters = waiters.len(), "Session refreshed, replaying requests");

                let transport = self.transport.as_ref();
                waiters
                    .drain_in_order(|request| replay(transport, request))
                    .await;
            }
            Err(cause) => {
                let failure = Error::RefreshFailed(Box::new(cause));
                let waiters = guard.finish();
                warn!(
                    waiters = waiters.len(),
                    error = %failure,
                    "Session refresh failed, signing out"
                );

                self.session.clear();
                if let Some(hook) = &self.on_expired {
                    hook(&failure);
                }
                waiters.reject_all(&failure);
            }
        }
    }

    async fn call_refresh(&self) -> Result<Option<Session>> {
        let Some(limit) = self.refresh_timeout else {
            return self.auth.refresh().await;
        };

        match tokio::time::timeout(limit, self.auth.refresh()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Network(format!(
                "session refresh timed out after {}ms",
                limit.as_millis()
            ))),
        }
    }

    /// Return to idle and take the parked requests.
    fn end_cycle(&self) -> RequestQueue {
        let mut shared = self.shared.lock();
        shared.state = RefreshState::Idle;
        std::mem::take(&mut shared.queue)
    }
}

/// Replay a request after a refresh. A second 401 is final.
pub(crate) async fn replay(transport: &dyn Transport, request: OutboundRequest) -> Outcome {
    debug!(request_id = %request.id(), path = %request.path(), "Replaying request");
    transport
        .execute(&request)
        .await
        .map_err(settle_retried)
}

/// Turn a 401 on an already-refreshed request into [`Error::AlreadyRetried`].
pub(crate) fn settle_retried(error: Error) -> Error {
    match error {
        Error::Unauthorized(message) => Error::AlreadyRetried(message),
        other => other,
    }
}

/// Ends the cycle even if the cycle task panics or is aborted, so the
/// coordinator returns to idle and no waiter is left without an outcome.
struct CycleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    finished: bool,
}

impl<'a> CycleGuard<'a> {
    fn new(coordinator: &'a RefreshCoordinator) -> Self {
        Self {
            coordinator,
            finished: false,
        }
    }

    fn finish(mut self) -> RequestQueue {
        self.finished = true;
        self.coordinator.end_cycle()
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let waiters = self.coordinator.end_cycle();
        warn!(waiters = waiters.len(), "Session refresh abandoned");
        waiters.reject_all(&Error::RefreshFailed(Box::new(Error::Cancelled(
            "session refresh was abandoned".to_string(),
        ))));
    }
}
