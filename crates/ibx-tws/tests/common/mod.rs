//! Scripted in-memory transport for session client tests.

#![allow(dead_code)]

use ibx_tws::{ClientConfig, SessionCallbacks, SessionClient, Transport, TwsError, TwsResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Inbound event the fake delivers from its receive loop.
#[derive(Debug, Clone)]
pub enum Event {
    Time(i64),
    Error(i64, i32, String),
    NextValidId(i64),
}

/// What the fake does when a current-time request is sent.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Deliver these events in order.
    Events(Vec<Event>),
    /// Never answer.
    Silent,
}

impl Reply {
    pub fn time(seconds: i64) -> Self {
        Self::Events(vec![Event::Time(seconds)])
    }
}

/// Call counters shared with the test body.
#[derive(Debug, Default)]
pub struct Probe {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub sends: AtomicUsize,
    pub connection_closed_calls: AtomicUsize,
}

impl Probe {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct Inbox {
    pub events: VecDeque<Event>,
    pub closed: bool,
}

pub struct FakeTransport {
    /// Report connected right after `open`.
    pub connect_on_open: bool,
    /// Emit a next-valid-id event when the receive loop starts.
    pub announce_ready: bool,
    /// Fail `open` with a transport error.
    pub refuse_open: bool,
    pub reply: Mutex<Reply>,
    pub connected: AtomicBool,
    pub explode_on_status: AtomicBool,
    pub inbox: Mutex<Inbox>,
    pub cond: Condvar,
    pub probe: Arc<Probe>,
}

impl FakeTransport {
    pub fn new(reply: Reply) -> Self {
        Self {
            connect_on_open: true,
            announce_ready: true,
            refuse_open: false,
            reply: Mutex::new(reply),
            connected: AtomicBool::new(false),
            explode_on_status: AtomicBool::new(false),
            inbox: Mutex::new(Inbox::default()),
            cond: Condvar::new(),
            probe: Arc::new(Probe::default()),
        }
    }

    /// Transport that opens but never reports connected.
    pub fn never_connects() -> Self {
        Self {
            connect_on_open: false,
            announce_ready: false,
            ..Self::new(Reply::Silent)
        }
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock() = reply;
    }

    /// Push an unsolicited event into the receive loop.
    pub fn inject(&self, event: Event) {
        self.inbox.lock().events.push_back(event);
        self.cond.notify_all();
    }

    /// Make `is_connected` panic, simulating a failure during status assembly.
    pub fn set_explode_on_status(&self, explode: bool) {
        self.explode_on_status.store(explode, Ordering::SeqCst);
    }

    fn next_event(&self) -> Option<Event> {
        let mut inbox = self.inbox.lock();
        loop {
            if let Some(event) = inbox.events.pop_front() {
                return Some(event);
            }
            if inbox.closed {
                return None;
            }
            self.cond.wait(&mut inbox);
        }
    }
}

impl Transport for FakeTransport {
    fn open(&self, _host: &str, _port: u16, _client_id: i32) -> TwsResult<()> {
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        if self.refuse_open {
            return Err(TwsError::TransportOpen("connection refused".to_string()));
        }
        *self.inbox.lock() = Inbox::default();
        self.connected.store(self.connect_on_open, Ordering::SeqCst);
        Ok(())
    }

    fn run(&self, callbacks: &dyn SessionCallbacks) -> TwsResult<()> {
        callbacks.connect_ack();
        if self.announce_ready {
            callbacks.next_valid_id(1);
        }

        while let Some(event) = self.next_event() {
            match event {
                Event::Time(t) => callbacks.current_time(t),
                Event::Error(id, code, message) => callbacks.error(id, code, &message),
                Event::NextValidId(id) => callbacks.next_valid_id(id),
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        self.probe
            .connection_closed_calls
            .fetch_add(1, Ordering::SeqCst);
        callbacks.connection_closed();
        Ok(())
    }

    fn request_current_time(&self) -> TwsResult<()> {
        self.probe.sends.fetch_add(1, Ordering::SeqCst);
        let reply = self.reply.lock().clone();
        if let Reply::Events(events) = reply {
            let mut inbox = self.inbox.lock();
            inbox.events.extend(events);
            self.cond.notify_all();
        }
        Ok(())
    }

    fn close(&self) -> TwsResult<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.inbox.lock().closed = true;
        self.cond.notify_all();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        if self.explode_on_status.load(Ordering::SeqCst) {
            panic!("status probe exploded");
        }
        self.connected.load(Ordering::SeqCst)
    }

    fn server_version(&self) -> Option<i32> {
        Some(176)
    }
}

/// Config with short timeouts suitable for tests.
pub fn fast_config() -> ClientConfig {
    ClientConfig {
        connect_timeout_ms: 300,
        connect_poll_interval_ms: 50,
        dispatch_join_timeout_ms: 1_000,
        ..ClientConfig::default()
    }
}

pub fn client_with(transport: FakeTransport) -> SessionClient<FakeTransport> {
    SessionClient::with_transport(fast_config(), transport)
}
