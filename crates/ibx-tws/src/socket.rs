//! TCP transport to a terminal process.
//!
//! Handles the socket handshake, the blocking receive loop and outbound
//! requests. Closing shuts the socket down in both directions, which is
//! what makes a blocked receive loop return.

use crate::error::{TwsError, TwsResult};
use crate::transport::{SessionCallbacks, Transport};
use crate::wire::{self, InboundMessage, OutboundMessage, ServerHello};
use parking_lot::Mutex;
use std::io::BufReader;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Socket-level timeouts.
#[derive(Debug, Clone)]
pub struct TcpTransportConfig {
    /// TCP connect timeout per resolved address.
    pub connect_timeout: Duration,
    /// Read timeout while waiting for the server hello.
    pub handshake_timeout: Duration,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

struct Connection {
    writer: TcpStream,
    /// Taken by the receive loop when it starts.
    reader: Option<TcpStream>,
    peer: SocketAddr,
}

/// `Transport` over a plain TCP socket.
pub struct TcpTransport {
    config: TcpTransportConfig,
    conn: Mutex<Option<Connection>>,
    connected: AtomicBool,
    /// 0 until a handshake completes.
    server_version: AtomicI32,
}

impl TcpTransport {
    pub fn new(config: TcpTransportConfig) -> Self {
        Self {
            config,
            conn: Mutex::new(None),
            connected: AtomicBool::new(false),
            server_version: AtomicI32::new(0),
        }
    }

    fn connect_stream(&self, host: &str, port: u16) -> TwsResult<TcpStream> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| TwsError::TransportOpen(format!("resolve {host}:{port}: {e}")))?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%addr, ?e, "Connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(TwsError::TransportOpen(match last_err {
            Some(e) => format!("{host}:{port}: {e}"),
            None => format!("{host}:{port}: no addresses resolved"),
        }))
    }

    fn handshake(&self, stream: &mut TcpStream, client_id: i32) -> TwsResult<ServerHello> {
        stream.set_read_timeout(Some(self.config.handshake_timeout))?;
        wire::write_frame(stream, &wire::encode_handshake()?)?;

        let payload = wire::read_frame(stream)?
            .ok_or_else(|| TwsError::Handshake("connection closed during handshake".to_string()))?;
        let hello = ServerHello::decode(&wire::split_fields(&payload)?)?;

        let start = OutboundMessage::StartApi { client_id }.encode(hello.server_version)?;
        wire::write_frame(stream, &start)?;
        stream.set_read_timeout(None)?;
        Ok(hello)
    }

    fn send(&self, message: OutboundMessage) -> TwsResult<()> {
        let version = self.server_version.load(Ordering::SeqCst);
        let bytes = message.encode(version)?;
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(TwsError::NotConnected)?;
        wire::write_frame(&mut conn.writer, &bytes)
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(TcpTransportConfig::default())
    }
}

impl Transport for TcpTransport {
    fn open(&self, host: &str, port: u16, client_id: i32) -> TwsResult<()> {
        let mut guard = self.conn.lock();
        if guard.is_some() && self.connected.load(Ordering::SeqCst) {
            return Err(TwsError::TransportOpen("session already open".to_string()));
        }

        let mut stream = self.connect_stream(host, port)?;
        // Request/response latency matters more than throughput here.
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;

        let hello = self.handshake(&mut stream, client_id)?;
        let reader = stream.try_clone()?;

        self.server_version.store(hello.server_version, Ordering::SeqCst);
        *guard = Some(Connection {
            writer: stream,
            reader: Some(reader),
            peer,
        });
        self.connected.store(true, Ordering::SeqCst);

        info!(
            %peer,
            client_id,
            server_version = hello.server_version,
            connection_time = %hello.connection_time,
            "Terminal handshake complete"
        );
        Ok(())
    }

    fn run(&self, callbacks: &dyn SessionCallbacks) -> TwsResult<()> {
        let (reader, peer) = {
            let mut guard = self.conn.lock();
            let conn = guard.as_mut().ok_or(TwsError::NotConnected)?;
            let reader = conn.reader.take().ok_or_else(|| {
                TwsError::TransportOpen("receive loop already running".to_string())
            })?;
            (reader, conn.peer)
        };

        callbacks.connect_ack();
        debug!(%peer, "Receive loop started");

        let mut reader = BufReader::new(reader);
        let outcome = loop {
            let payload = match wire::read_frame(&mut reader) {
                Ok(Some(payload)) => payload,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            match wire::split_fields(&payload).and_then(|f| InboundMessage::decode(&f)) {
                Ok(message) => route(message, callbacks),
                Err(e) => warn!(%e, "Skipping malformed message"),
            }
        };

        // Still flagged connected means the peer went away, not us.
        let dropped = self.connected.swap(false, Ordering::SeqCst);
        match &outcome {
            Ok(()) if dropped => warn!(%peer, "Terminal closed the connection"),
            Err(e) if dropped => error!(%peer, %e, "Receive loop failed"),
            _ => debug!(%peer, "Receive loop stopped after close"),
        }
        callbacks.connection_closed();

        if dropped {
            outcome
        } else {
            Ok(())
        }
    }

    fn request_current_time(&self) -> TwsResult<()> {
        if !self.is_connected() {
            return Err(TwsError::NotConnected);
        }
        self.send(OutboundMessage::ReqCurrentTime)
    }

    fn close(&self) -> TwsResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        let Some(conn) = self.conn.lock().take() else {
            return Ok(());
        };

        match conn.writer.shutdown(Shutdown::Both) {
            Ok(()) => {}
            // Peer already gone.
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => {}
            Err(e) => return Err(e.into()),
        }
        info!(peer = %conn.peer, "Terminal socket closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn server_version(&self) -> Option<i32> {
        match self.server_version.load(Ordering::SeqCst) {
            0 => None,
            v => Some(v),
        }
    }
}

/// Deliver one decoded message to the callbacks.
fn route(message: InboundMessage, callbacks: &dyn SessionCallbacks) {
    match message {
        InboundMessage::Error {
            request_id,
            code,
            message,
        } => callbacks.error(request_id, code, &message),
        InboundMessage::NextValidId { order_id } => callbacks.next_valid_id(order_id),
        InboundMessage::CurrentTime { time } => callbacks.current_time(time),
        InboundMessage::Other { msg_id } => debug!(msg_id, "Ignoring unconsumed message"),
    }
}
