//! Test doubles for the transport and auth seams.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use expensa_session::Session;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Semaphore;

use crate::auth_backend::AuthBackend;
use crate::coordinator::RefreshCoordinator;
use crate::error::{Error, Result};
use crate::queue::Outcome;
use crate::request::{ApiResponse, OutboundRequest};
use crate::transport::Transport;

/// A call seen by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub path: String,
    pub retried: bool,
}

/// Transport answering from per-path scripts.
///
/// Each call to a path pops the next scripted outcome; once a path's script
/// is exhausted it answers 200 with `{"status":"success","data":"<path>"}`.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `outcome` for the next call to `path`.
    pub fn respond(&self, path: &str, outcome: Outcome) -> &Self {
        self.scripts
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Queue a 401 for the next call to `path`.
    pub fn expire(&self, path: &str) -> &Self {
        self.respond(path, Err(Error::Unauthorized("Token expired".to_string())))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.path == path).count()
    }
}

/// The default body for `path`.
pub(crate) fn echo(path: &str) -> ApiResponse {
    ApiResponse::from_json(200, &json!({"status": "success", "data": path}))
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &OutboundRequest) -> Result<ApiResponse> {
        self.calls.lock().push(Call {
            path: request.path().to_string(),
            retried: request.is_retried(),
        });

        let scripted = self
            .scripts
            .lock()
            .get_mut(request.path())
            .and_then(VecDeque::pop_front);

        // Let other tasks observe the in-flight call.
        tokio::task::yield_now().await;

        scripted.unwrap_or_else(|| Ok(echo(request.path())))
    }
}

/// Auth backend with a scripted refresh result and an optional gate that
/// holds every refresh until opened.
#[derive(Debug)]
pub(crate) struct FakeAuth {
    refresh_result: Mutex<Result<Option<Session>>>,
    gate: Option<Semaphore>,
    panic_on_refresh: bool,
    logout_result: Mutex<Result<()>>,
    refreshes: AtomicUsize,
    logouts: AtomicUsize,
}

impl FakeAuth {
    /// Refresh succeeds immediately with `identity`.
    pub fn succeeding(identity: Option<Session>) -> Self {
        Self {
            refresh_result: Mutex::new(Ok(identity)),
            gate: None,
            panic_on_refresh: false,
            logout_result: Mutex::new(Ok(())),
            refreshes: AtomicUsize::new(0),
            logouts: AtomicUsize::new(0),
        }
    }

    /// Refresh fails immediately with `error`.
    pub fn failing(error: Error) -> Self {
        let auth = Self::succeeding(None);
        *auth.refresh_result.lock() = Err(error);
        auth
    }

    /// Refresh panics.
    pub fn panicking() -> Self {
        Self {
            panic_on_refresh: true,
            ..Self::succeeding(None)
        }
    }

    /// Hold refreshes until [`FakeAuth::open`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// Make server-side logout fail.
    pub fn with_failing_logout(self) -> Self {
        *self.logout_result.lock() = Err(Error::Network("connection refused".to_string()));
        self
    }

    /// Release held refreshes.
    pub fn open(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthBackend for FakeAuth {
    async fn refresh(&self) -> Result<Option<Session>> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| Error::Cancelled("gate closed".to_string()))?
                .forget();
        }
        if self.panic_on_refresh {
            panic!("refresh backend exploded");
        }
        self.refresh_result.lock().clone()
    }

    async fn logout(&self) -> Result<()> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        self.logout_result.lock().clone()
    }
}

/// Wait until `n` requests are parked on `coordinator`.
pub(crate) async fn wait_for_waiters(coordinator: &RefreshCoordinator, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while coordinator.waiting() < n {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("waiters never arrived");
}
