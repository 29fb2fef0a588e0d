//! Blocking session client.
//!
//! Turns the terminal's callback-driven protocol into synchronous calls:
//! `connect` opens the transport and supervises the dispatch thread,
//! `request_current_time` sends a request and blocks on the wrapper's
//! signal until the answer (or a timeout) arrives.
//!
//! Public `bool`/`Option` operations never panic or return errors across
//! the boundary; failures are logged and surfaced as falsy values. The
//! `try_*` variants expose the typed `TwsError` for callers that want it.

use crate::config::ClientConfig;
use crate::dispatch::DispatchLoop;
use crate::error::{TwsError, TwsResult};
use crate::socket::TcpTransport;
use crate::transport::Transport;
use crate::wrapper::{PendingOutcome, SessionWrapper};
use ibx_core::{ConnectionStatus, TimeResult};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "DISCONNECTED"),
            Self::Connected => write!(f, "CONNECTED"),
        }
    }
}

/// One logical connection attempt: endpoint plus the local connected flag.
#[derive(Debug)]
struct Session {
    host: String,
    port: u16,
    client_id: i32,
    connected: AtomicBool,
}

/// Synchronous client for one terminal session.
pub struct SessionClient<T: Transport = TcpTransport> {
    config: ClientConfig,
    session: Session,
    transport: Arc<T>,
    wrapper: Arc<SessionWrapper>,
    /// Guards the dispatch handle; serializes connect and disconnect.
    dispatch: Mutex<Option<DispatchLoop>>,
    /// Serializes requests sharing the single pending slot.
    request_lock: Mutex<()>,
}

impl SessionClient<TcpTransport> {
    /// Client over a TCP transport with default socket timeouts.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, TcpTransport::default())
    }
}

impl<T: Transport> SessionClient<T> {
    /// Client over the given transport.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let wrapper = SessionWrapper::new(config.error_codes.clone(), config.timestamp_convention);
        Self {
            session: Session {
                host: config.host.clone(),
                port: config.port,
                client_id: config.client_id,
                connected: AtomicBool::new(false),
            },
            config,
            transport: Arc::new(transport),
            wrapper: Arc::new(wrapper),
            dispatch: Mutex::new(None),
            request_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Callback-side state of this session.
    pub fn wrapper(&self) -> &SessionWrapper {
        &self.wrapper
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Connect to the terminal. Returns `true` once the transport reports
    /// connected within the configured timeout.
    pub fn connect(&self) -> bool {
        match self.try_connect() {
            Ok(()) => true,
            Err(e) => {
                error!(
                    host = %self.session.host,
                    port = self.session.port,
                    %e,
                    "Failed to connect to terminal"
                );
                false
            }
        }
    }

    /// Connect, reporting why on failure.
    pub fn try_connect(&self) -> TwsResult<()> {
        self.config.validate()?;
        let mut dispatch = self.dispatch.lock();

        if self.is_connected() {
            debug!("Already connected");
            return Ok(());
        }

        // Reap a loop left over from a dropped connection.
        if let Some(stale) = dispatch.take() {
            let _ = self.transport.close();
            stale.join(self.config.dispatch_join_timeout());
        }

        info!(
            host = %self.session.host,
            port = self.session.port,
            client_id = self.session.client_id,
            "Connecting to terminal"
        );
        self.wrapper.reset_session();
        self.transport.open(
            &self.session.host,
            self.session.port,
            self.session.client_id,
        )?;

        match DispatchLoop::spawn(Arc::clone(&self.transport), Arc::clone(&self.wrapper)) {
            Ok(handle) => *dispatch = Some(handle),
            Err(e) => {
                let _ = self.transport.close();
                return Err(e);
            }
        }

        let timeout = self.config.connect_timeout();
        if !self.poll_until_ready(timeout) {
            warn!(?timeout, "Terminal did not report connected in time");
            let _ = self.transport.close();
            if let Some(handle) = dispatch.take() {
                handle.join(self.config.dispatch_join_timeout());
            }
            return Err(TwsError::ConnectionTimeout(timeout));
        }

        self.session.connected.store(true, Ordering::SeqCst);
        info!(
            server_version = ?self.transport.server_version(),
            "Connected to terminal"
        );
        Ok(())
    }

    /// Poll transport readiness until it holds or `timeout` runs out.
    /// Checks once before the first sleep.
    fn poll_until_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let interval = self.config.connect_poll_interval();
        loop {
            if self.transport_ready() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(interval.min(deadline - now));
        }
    }

    fn transport_ready(&self) -> bool {
        self.transport.is_connected()
            && (!self.config.wait_for_next_valid_id || self.wrapper.next_valid_id().is_some())
    }

    /// Close the session and wait briefly for the dispatch thread.
    ///
    /// Idempotent: a second call finds the transport closed and does nothing.
    pub fn disconnect(&self) {
        let mut dispatch = self.dispatch.lock();

        if self.transport.is_connected() {
            match self.transport.close() {
                Ok(()) => info!("Disconnected from terminal"),
                Err(e) => error!(%e, "Error while closing terminal session"),
            }
        } else {
            debug!("Already disconnected");
        }
        self.session.connected.store(false, Ordering::SeqCst);

        if let Some(handle) = dispatch.take() {
            handle.join(self.config.dispatch_join_timeout());
        }
    }

    /// Connected locally, at transport level, and no lost link observed.
    ///
    /// Observing a lost link moves the session back to `Disconnected`.
    pub fn is_connected(&self) -> bool {
        if !self.session.connected.load(Ordering::SeqCst) {
            return false;
        }
        if !self.transport.is_connected() || self.wrapper.is_link_lost() {
            if self.session.connected.swap(false, Ordering::SeqCst) {
                warn!("Terminal link lost, session marked disconnected");
            }
            return false;
        }
        true
    }

    pub fn state(&self) -> SessionState {
        if self.is_connected() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    /// Health snapshot. Never fails: a panic while assembling it yields an
    /// unavailable status carrying the reason.
    pub fn connection_status(&self) -> ConnectionStatus {
        match catch_unwind(AssertUnwindSafe(|| self.assemble_status())) {
            Ok(status) => status,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown failure".to_string());
                error!(%reason, "Failed to assemble connection status");
                ConnectionStatus::unavailable(format!("Error getting status: {reason}"))
            }
        }
    }

    fn assemble_status(&self) -> ConnectionStatus {
        ConnectionStatus {
            connected: self.is_connected(),
            client_id: self.session.client_id,
            host: self.session.host.clone(),
            port: self.session.port,
            connection_time: self.wrapper.connection_time(),
            error_message: self.wrapper.error_message(),
        }
    }

    /// Request terminal time, waiting at most `timeout`.
    pub fn request_current_time(&self, timeout: Duration) -> Option<TimeResult> {
        match self.try_request_current_time(timeout) {
            Ok(result) => Some(result),
            Err(TwsError::RequestTimeout(t)) => {
                error!(timeout = ?t, "Timeout waiting for time response from terminal");
                None
            }
            Err(e) => {
                error!(%e, "Current time request failed");
                None
            }
        }
    }

    /// Request terminal time using the configured request timeout.
    pub fn current_time(&self) -> Option<TimeResult> {
        self.request_current_time(self.config.request_timeout())
    }

    /// Request terminal time, reporting why on failure.
    ///
    /// Overlapping callers are serialized; each waits its turn for the
    /// single pending slot.
    pub fn try_request_current_time(&self, timeout: Duration) -> TwsResult<TimeResult> {
        if !self.is_connected() {
            return Err(TwsError::NotConnected);
        }

        let _turn = self.request_lock.lock();
        // The session may have dropped while this caller was queued.
        if !self.is_connected() {
            return Err(TwsError::NotConnected);
        }

        // Reset strictly before send so a stale signal cannot answer this request.
        self.wrapper.reset_pending();
        info!("Requesting current time from terminal");
        self.transport.request_current_time()?;

        if !self.wrapper.wait_for_signal(timeout) {
            return Err(TwsError::RequestTimeout(timeout));
        }

        match self.wrapper.pending_outcome() {
            PendingOutcome {
                error_message: Some(message),
                ..
            } => Err(TwsError::Protocol(message)),
            PendingOutcome {
                current_time: Some(current_time),
                error_message: None,
            } => Ok(TimeResult {
                current_time,
                server_version: self.transport.server_version(),
                connection_time: self.wrapper.connection_time(),
            }),
            PendingOutcome {
                current_time: None,
                error_message: None,
            } if self.wrapper.is_link_lost() => Err(TwsError::ConnectionLost),
            _ => Err(TwsError::EmptyResponse),
        }
    }
}

impl<T: Transport> Drop for SessionClient<T> {
    fn drop(&mut self) {
        if self.dispatch.get_mut().is_some() || self.transport.is_connected() {
            self.disconnect();
        }
    }
}
