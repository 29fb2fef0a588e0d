//! Single-slot request signal.
//!
//! A reusable reset/wait/signal primitive used to hand "the expected event
//! happened" from the dispatch thread to a blocked caller. The signaled
//! flag is sticky: a signal raised before anybody waits is still observed
//! by the next `wait`.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct SlotState {
    signaled: bool,
    /// Total signals raised since construction (diagnostics only).
    raised: u64,
}

/// Reusable single-slot signal built on a condition variable.
#[derive(Debug, Default)]
pub struct PendingRequestSignal {
    state: Mutex<SlotState>,
    cond: Condvar,
}

impl PendingRequestSignal {
    /// Create an unsignaled primitive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return to the unsignaled state.
    pub fn reset(&self) {
        self.state.lock().signaled = false;
    }

    /// Mark the slot signaled and wake every waiter.
    pub fn signal(&self) {
        let mut state = self.state.lock();
        state.signaled = true;
        state.raised += 1;
        self.cond.notify_all();
    }

    /// Block until signaled or until `timeout` elapses.
    ///
    /// Returns `true` if the slot was signaled, `false` on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if !state.signaled {
            // Spurious wakeups are absorbed by the predicate.
            let _ = self
                .cond
                .wait_while_for(&mut state, |s| !s.signaled, timeout);
        }
        state.signaled
    }

    /// Current flag without blocking.
    pub fn is_signaled(&self) -> bool {
        self.state.lock().signaled
    }

    /// Number of signals raised so far.
    pub fn signal_count(&self) -> u64 {
        self.state.lock().raised
    }
}
