//! Background dispatch thread.
//!
//! One thread per open session runs the transport's receive loop. The loop
//! ends only when the transport is closed or the connection drops; teardown
//! waits for it with a bounded timeout.

use crate::error::TwsResult;
use crate::signal::PendingRequestSignal;
use crate::transport::{SessionCallbacks, Transport};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const THREAD_NAME: &str = "tws-dispatch";

/// Raises the exit signal when dropped, including during a panic unwind.
struct ExitGuard(Arc<PendingRequestSignal>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.signal();
    }
}

/// Handle to a running dispatch thread.
pub struct DispatchLoop {
    handle: JoinHandle<()>,
    exited: Arc<PendingRequestSignal>,
}

impl DispatchLoop {
    /// Start the receive loop of `transport` on a new thread.
    pub fn spawn<T, C>(transport: Arc<T>, callbacks: Arc<C>) -> TwsResult<Self>
    where
        T: Transport + ?Sized,
        C: SessionCallbacks + 'static,
    {
        let exited = Arc::new(PendingRequestSignal::new());
        let guard = ExitGuard(Arc::clone(&exited));

        let handle = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let _guard = guard;
                debug!("Dispatch loop running");
                match transport.run(callbacks.as_ref()) {
                    Ok(()) => info!("Dispatch loop finished"),
                    Err(e) => error!(%e, "Dispatch loop ended with error"),
                }
            })?;

        Ok(Self { handle, exited })
    }

    /// Wait up to `timeout` for the thread to exit, then join it.
    ///
    /// Returns `false` if the thread was still running and got detached.
    pub fn join(self, timeout: Duration) -> bool {
        if !self.exited.wait(timeout) {
            warn!(?timeout, "Dispatch loop did not exit in time, detaching");
            return false;
        }
        if self.handle.join().is_err() {
            error!("Dispatch loop panicked");
        }
        true
    }
}
