//! Callback-side session state.
//!
//! `SessionWrapper` is the only place inbound terminal events change
//! session state. The dispatch thread is its sole writer; callers read
//! snapshots and block on the pending-request signal.
//!
//! Cached time/error values are only meaningful between `reset_pending`
//! and the next signal. The next request overwrites them.

use crate::config::ErrorCodePolicy;
use crate::signal::PendingRequestSignal;
use crate::transport::SessionCallbacks;
use chrono::{DateTime, Utc};
use ibx_core::TimestampConvention;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct CachedState {
    current_time: Option<DateTime<Utc>>,
    error_message: Option<String>,
    connection_time: Option<DateTime<Utc>>,
    next_valid_id: Option<i64>,
    link_lost: bool,
}

/// Outcome of the in-flight request as seen after the signal fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOutcome {
    pub current_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Receiver of terminal callbacks.
pub struct SessionWrapper {
    policy: ErrorCodePolicy,
    convention: TimestampConvention,
    state: Mutex<CachedState>,
    pending: PendingRequestSignal,
}

impl SessionWrapper {
    /// Create a wrapper with the given code policy and timestamp convention.
    pub fn new(policy: ErrorCodePolicy, convention: TimestampConvention) -> Self {
        Self {
            policy,
            convention,
            state: Mutex::new(CachedState::default()),
            pending: PendingRequestSignal::new(),
        }
    }

    /// Store the received server time and wake the requester.
    pub fn on_time_received(&self, timestamp: i64) {
        match self.convention.interpret(timestamp) {
            Ok(time) => {
                info!(raw = timestamp, time = %time, "Received current time from terminal");
                self.state.lock().current_time = Some(time);
            }
            Err(e) => {
                error!(raw = timestamp, %e, "Unusable time from terminal");
                self.state.lock().error_message = Some(format!("Invalid server time: {e}"));
            }
        }
        self.pending.signal();
    }

    /// Record a terminal error.
    ///
    /// Informational codes are logged and otherwise ignored. Connection-lost
    /// codes also mark the link lost and wake the requester.
    pub fn on_error(&self, request_id: i64, code: i32, message: &str) {
        if self.policy.is_informational(code) {
            info!(code, "Terminal notice: {message}");
            return;
        }

        let formatted = format!("Terminal error {code} (request {request_id}): {message}");
        error!(request_id, code, "{formatted}");

        let lost = self.policy.is_connection_lost(code);
        {
            let mut state = self.state.lock();
            state.error_message = Some(formatted);
            if lost {
                state.link_lost = true;
            }
        }

        if lost {
            warn!(code, "Connection-lost code received, waking pending request");
            self.pending.signal();
        }
    }

    /// Record when the terminal acknowledged the connection.
    pub fn on_connect_acknowledged(&self) {
        let now = Utc::now();
        self.state.lock().connection_time = Some(now);
        info!(at = %now, "Terminal connection acknowledged");
    }

    /// Record the terminal's ready marker.
    pub fn on_next_valid_id(&self, order_id: i64) {
        self.state.lock().next_valid_id = Some(order_id);
        info!(order_id, "Session ready, next valid order id received");
    }

    /// Receive loop ended; wake anything still waiting.
    pub fn on_connection_closed(&self) {
        self.state.lock().link_lost = true;
        debug!("Receive loop reported connection closed");
        self.pending.signal();
    }

    /// Clear the signal and cached request values before a new request.
    ///
    /// Must be called before the request is sent, never after.
    pub fn reset_pending(&self) {
        {
            let mut state = self.state.lock();
            state.current_time = None;
            state.error_message = None;
        }
        self.pending.reset();
    }

    /// Block until an awaited event arrives or `timeout` elapses.
    ///
    /// Returns `true` when signaled. Serialized by the client; one waiter
    /// at a time.
    pub fn wait_for_signal(&self, timeout: Duration) -> bool {
        self.pending.wait(timeout)
    }

    /// Clear per-connection markers before opening a new session.
    ///
    /// Errors from a previous session do not carry over.
    pub fn reset_session(&self) {
        let mut state = self.state.lock();
        state.next_valid_id = None;
        state.error_message = None;
        state.link_lost = false;
    }

    /// Cached time and error for the request that was just signaled.
    pub fn pending_outcome(&self) -> PendingOutcome {
        let state = self.state.lock();
        PendingOutcome {
            current_time: state.current_time,
            error_message: state.error_message.clone(),
        }
    }

    /// Last received server time.
    pub fn current_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().current_time
    }

    /// Last non-informational terminal error.
    pub fn error_message(&self) -> Option<String> {
        self.state.lock().error_message.clone()
    }

    /// When the current session was acknowledged.
    pub fn connection_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().connection_time
    }

    /// Ready marker of the current session, if received.
    pub fn next_valid_id(&self) -> Option<i64> {
        self.state.lock().next_valid_id
    }

    /// Whether a connection-lost code or a closed receive loop was observed
    /// since the last `reset_session`.
    pub fn is_link_lost(&self) -> bool {
        self.state.lock().link_lost
    }

    /// Number of times the pending signal has fired.
    pub fn signal_count(&self) -> u64 {
        self.pending.signal_count()
    }
}

impl Default for SessionWrapper {
    fn default() -> Self {
        Self::new(ErrorCodePolicy::default(), TimestampConvention::default())
    }
}

impl SessionCallbacks for SessionWrapper {
    fn next_valid_id(&self, order_id: i64) {
        self.on_next_valid_id(order_id);
    }

    fn current_time(&self, time: i64) {
        self.on_time_received(time);
    }

    fn error(&self, request_id: i64, code: i32, message: &str) {
        self.on_error(request_id, code, message);
    }

    fn connect_ack(&self) {
        self.on_connect_acknowledged();
    }

    fn connection_closed(&self) {
        self.on_connection_closed();
    }
}
