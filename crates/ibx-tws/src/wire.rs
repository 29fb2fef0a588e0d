//! Terminal socket wire format.
//!
//! Every message is a frame: a 4-byte big-endian payload length followed by
//! the payload, a sequence of text fields each terminated by a NUL byte.
//! The connection opens with the `API\0` prefix and a framed client version
//! range; the server answers with its version and connection time.

use crate::error::{TwsError, TwsResult};
use std::io::{ErrorKind, Read, Write};

/// Prefix sent before the version range on a fresh connection.
pub const API_PREFIX: &[u8] = b"API\0";
/// Lowest client protocol version offered.
pub const MIN_CLIENT_VERSION: i32 = 100;
/// Highest client protocol version offered. Caps the server at a framing
/// where every message id is a text field.
pub const MAX_CLIENT_VERSION: i32 = 176;
/// Upper bound on a single frame payload.
pub const MAX_FRAME_LEN: usize = 0x00FF_FFFF;
/// First server version that expects the optional-capabilities field in
/// the start-api message.
pub const MIN_SERVER_VER_OPTIONAL_CAPABILITIES: i32 = 72;

/// Outbound message ids.
pub mod out_id {
    pub const REQ_CURRENT_TIME: i32 = 49;
    pub const START_API: i32 = 71;
}

/// Inbound message ids.
pub mod in_id {
    pub const ERR_MSG: i32 = 4;
    pub const NEXT_VALID_ID: i32 = 9;
    pub const CURRENT_TIME: i32 = 49;
}

/// Wrap `payload` in a length-prefixed frame.
pub fn frame(payload: &[u8]) -> TwsResult<Vec<u8>> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(TwsError::Wire(format!(
            "frame payload of {} bytes exceeds limit",
            payload.len()
        )));
    }
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Encode fields as a NUL-terminated payload and frame it.
pub fn encode_fields<S: AsRef<str>>(fields: &[S]) -> TwsResult<Vec<u8>> {
    let mut payload = Vec::new();
    for field in fields {
        let field = field.as_ref();
        if field.as_bytes().contains(&0) {
            return Err(TwsError::Wire("field contains NUL byte".to_string()));
        }
        payload.extend_from_slice(field.as_bytes());
        payload.push(0);
    }
    frame(&payload)
}

/// Bytes opening a connection: prefix plus framed version range.
pub fn encode_handshake() -> TwsResult<Vec<u8>> {
    let versions = format!("v{MIN_CLIENT_VERSION}..{MAX_CLIENT_VERSION}");
    let mut buf = API_PREFIX.to_vec();
    buf.extend_from_slice(&frame(versions.as_bytes())?);
    Ok(buf)
}

/// Read one frame payload.
///
/// Returns `Ok(None)` on a clean end of stream before any length byte.
pub fn read_frame<R: Read>(reader: &mut R) -> TwsResult<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TwsError::Wire(format!("frame length {len} exceeds limit")));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Write one pre-encoded frame.
pub fn write_frame<W: Write>(writer: &mut W, bytes: &[u8]) -> TwsResult<()> {
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

/// Split a payload into its text fields.
pub fn split_fields(payload: &[u8]) -> TwsResult<Vec<String>> {
    let mut fields: Vec<String> = payload
        .split(|b| *b == 0)
        .map(|raw| {
            String::from_utf8(raw.to_vec())
                .map_err(|e| TwsError::Wire(format!("non UTF-8 field: {e}")))
        })
        .collect::<TwsResult<_>>()?;

    // Terminating NUL leaves one empty trailing piece.
    if payload.last() == Some(&0) {
        fields.pop();
    }
    Ok(fields)
}

/// Server reply to the connection handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    pub server_version: i32,
    pub connection_time: String,
}

impl ServerHello {
    pub fn decode(fields: &[String]) -> TwsResult<Self> {
        let server_version = parse_int::<i32>(fields, 0, "server_version")?;
        if server_version < MIN_CLIENT_VERSION {
            return Err(TwsError::Handshake(format!(
                "server version {server_version} is below supported minimum {MIN_CLIENT_VERSION}"
            )));
        }
        let connection_time = fields.get(1).cloned().unwrap_or_default();
        Ok(Self {
            server_version,
            connection_time,
        })
    }
}

/// Messages this client sends after the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    StartApi { client_id: i32 },
    ReqCurrentTime,
}

impl OutboundMessage {
    /// Encode as a frame for a server speaking `server_version`.
    pub fn encode(&self, server_version: i32) -> TwsResult<Vec<u8>> {
        match self {
            Self::StartApi { client_id } => {
                let mut fields = vec![
                    out_id::START_API.to_string(),
                    "2".to_string(),
                    client_id.to_string(),
                ];
                if server_version >= MIN_SERVER_VER_OPTIONAL_CAPABILITIES {
                    fields.push(String::new());
                }
                encode_fields(&fields)
            }
            Self::ReqCurrentTime => {
                encode_fields(&[out_id::REQ_CURRENT_TIME.to_string(), "1".to_string()])
            }
        }
    }
}

/// Messages routed by the receive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Error {
        request_id: i64,
        code: i32,
        message: String,
    },
    NextValidId {
        order_id: i64,
    },
    CurrentTime {
        time: i64,
    },
    /// Any message id this client does not consume.
    Other {
        msg_id: i32,
    },
}

impl InboundMessage {
    /// Decode from the fields of one frame.
    ///
    /// Layout after the message id is `version, ...`; trailing fields
    /// added by newer servers are ignored.
    pub fn decode(fields: &[String]) -> TwsResult<Self> {
        let msg_id = parse_int::<i32>(fields, 0, "msg_id")?;
        match msg_id {
            in_id::ERR_MSG => Ok(Self::Error {
                request_id: parse_int(fields, 2, "request_id")?,
                code: parse_int(fields, 3, "error_code")?,
                message: fields.get(4).cloned().unwrap_or_default(),
            }),
            in_id::NEXT_VALID_ID => Ok(Self::NextValidId {
                order_id: parse_int(fields, 2, "order_id")?,
            }),
            in_id::CURRENT_TIME => Ok(Self::CurrentTime {
                time: parse_int(fields, 2, "time")?,
            }),
            other => Ok(Self::Other { msg_id: other }),
        }
    }
}

fn parse_int<T: std::str::FromStr>(fields: &[String], idx: usize, name: &str) -> TwsResult<T> {
    let raw = fields
        .get(idx)
        .ok_or_else(|| TwsError::Wire(format!("missing field {name} at index {idx}")))?;
    raw.trim()
        .parse()
        .map_err(|_| TwsError::Wire(format!("invalid {name}: {raw:?}")))
}
