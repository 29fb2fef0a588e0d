//! Seams between the session client and the terminal connection.
//!
//! `Transport` is the outbound command side (open, send, close) plus the
//! blocking receive loop. `SessionCallbacks` is the fixed set of inbound
//! events the receive loop delivers. The client composes one of each
//! instead of a single object playing both roles.

use crate::error::TwsResult;

/// Inbound events delivered by a transport's receive loop.
///
/// Implementations are invoked from the dispatch thread only.
pub trait SessionCallbacks: Send + Sync {
    /// Terminal is ready for requests; carries the next usable order id.
    fn next_valid_id(&self, order_id: i64);

    /// Response to a current-time request, in raw terminal seconds.
    fn current_time(&self, time: i64);

    /// Error or notice from the terminal. `request_id` is -1 for
    /// session-level messages.
    fn error(&self, request_id: i64, code: i32, message: &str);

    /// Terminal accepted the connection handshake.
    fn connect_ack(&self);

    /// Receive loop is ending because the connection closed.
    fn connection_closed(&self) {}
}

/// Connection to a terminal process.
///
/// A transport is shared between the caller's thread and the dispatch
/// thread, so every method takes `&self`.
pub trait Transport: Send + Sync + 'static {
    /// Open the socket session and perform the terminal handshake.
    fn open(&self, host: &str, port: u16, client_id: i32) -> TwsResult<()>;

    /// Run the receive loop, routing inbound messages to `callbacks`.
    ///
    /// Blocks until the transport is closed or the connection drops.
    fn run(&self, callbacks: &dyn SessionCallbacks) -> TwsResult<()>;

    /// Send the "current time" request.
    fn request_current_time(&self) -> TwsResult<()>;

    /// Close the session. Unblocks a running receive loop.
    fn close(&self) -> TwsResult<()>;

    /// Transport-level connected state.
    fn is_connected(&self) -> bool;

    /// Server protocol version negotiated at open, if any.
    fn server_version(&self) -> Option<i32> {
        None
    }
}
