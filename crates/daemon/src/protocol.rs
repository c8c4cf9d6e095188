// SPDX-License-Identifier: MIT

//! Wire framing for the control socket, per spec.md §4.4 and §6: a
//! length-prefixed tagged-tree message, with file descriptors carried as
//! out-of-band `SCM_RIGHTS` ancillary data rather than in the in-band
//! payload.
//!
//! The four-byte length prefix carries no descriptors and is read and
//! written through the plain async socket; the payload that follows is
//! sent through a short synchronous `sendmsg`/`recvmsg` call on the raw
//! fd (via [`tokio::net::UnixStream::try_io`]) so the descriptors attached
//! to it land in the same kernel call as the bytes they're reserved
//! within, per `warden_adapters::fdpass`'s own rationale for doing this
//! off the async reactor rather than through `spawn_blocking`.

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, Interest};
use tokio::net::UnixStream;
use warden_adapters::fdpass;
use warden_core::value::{Mapping, Value};
use warden_core::wire::{self, WireError};

/// Messages larger than this are rejected outright rather than read
/// incrementally forever — the control socket only ever carries job
/// manifests and small replies.
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Every read and write on the connection is bounded by this timeout;
/// clients that stall past it are disconnected rather than held open
/// indefinitely (spec.md §5 notes the core itself places no per-request
/// timeout on IPC, but a stalled peer still must not wedge a connection
/// task forever).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed payload: {0}")]
    Wire(#[from] WireError),
    #[error("message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: u32, max: u32 },
    #[error("connection closed")]
    ConnectionClosed,
    #[error("timed out waiting for the peer")]
    Timeout,
}

/// Reads one framed message. Returns `Ok(None)` on a clean EOF before any
/// bytes of a new message have arrived (the ordinary way a connection
/// ends).
///
/// Waiting for the length prefix of the *next* message has no timeout —
/// spec.md §5 places no per-request timeout on IPC, and a connection may
/// sit idle between requests indefinitely. Once a message has started
/// arriving, the remaining reads are bounded by [`DEFAULT_TIMEOUT]` so a
/// peer that stalls mid-message cannot wedge the connection task forever.
pub async fn read_message(stream: &mut UnixStream) -> Result<Option<Value>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: len, max: MAX_MESSAGE_SIZE });
    }

    let (payload, fds) = tokio::time::timeout(DEFAULT_TIMEOUT, recv_payload(stream, len as usize))
        .await
        .map_err(|_| ProtocolError::Timeout)??;

    let fd_slots = fds.into_iter().map(Some).collect();
    Ok(Some(wire::decode(&payload, fd_slots)?))
}

/// Encodes and writes one message: a plain async write of the length
/// prefix, then a raw `sendmsg` carrying the payload and any descriptors
/// it reserved slots for.
pub async fn write_message(stream: &mut UnixStream, value: Value) -> Result<(), ProtocolError> {
    let (payload, fds) = wire::encode(value);
    if payload.len() > MAX_MESSAGE_SIZE as usize {
        return Err(ProtocolError::MessageTooLarge {
            size: payload.len() as u32,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let len_buf = (payload.len() as u32).to_be_bytes();
    tokio::time::timeout(DEFAULT_TIMEOUT, stream.write_all(&len_buf))
        .await
        .map_err(|_| ProtocolError::Timeout)??;

    tokio::time::timeout(DEFAULT_TIMEOUT, send_payload(stream, &payload, &fds))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    Ok(())
}

async fn recv_payload(
    stream: &mut UnixStream,
    len: usize,
) -> Result<(Vec<u8>, Vec<std::os::fd::OwnedFd>), io::Error> {
    let mut payload = vec![0u8; len];
    let mut fds = Vec::new();
    let mut filled = 0usize;

    while filled < payload.len() {
        stream.readable().await?;
        let result = stream.try_io(Interest::READABLE, || {
            let raw = stream.as_raw_fd();
            // SAFETY: `raw` is borrowed for the duration of this call only;
            // the stream itself outlives it.
            let borrowed = unsafe { BorrowedFd::borrow_raw(raw) };
            fdpass::recv_with_fds(borrowed, &mut payload[filled..]).map_err(io::Error::from)
        });
        match result {
            Ok((n, mut received_fds)) => {
                if n == 0 {
                    return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
                }
                filled += n;
                fds.append(&mut received_fds);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e),
        }
    }

    Ok((payload, fds))
}

async fn send_payload(
    stream: &mut UnixStream,
    payload: &[u8],
    fds: &[std::os::fd::OwnedFd],
) -> Result<(), io::Error> {
    use std::os::fd::AsFd;
    let borrowed_fds: Vec<BorrowedFd<'_>> = fds.iter().map(|f| f.as_fd()).collect();
    let mut sent = 0usize;

    while sent < payload.len() {
        stream.writable().await?;
        let result = stream.try_io(Interest::WRITABLE, || {
            let raw = stream.as_raw_fd();
            let borrowed = unsafe { BorrowedFd::borrow_raw(raw) };
            let attach: &[BorrowedFd<'_>] = if sent == 0 { &borrowed_fds } else { &[] };
            fdpass::send_with_fds(borrowed, &payload[sent..], attach).map_err(io::Error::from)
        });
        match result {
            Ok(n) => sent += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// A decoded request: the verb name and its argument (`Value::Null` for
/// the no-argument string form), per spec.md §4.4's framing rule.
pub struct Request {
    pub verb: String,
    pub argument: Value,
}

impl Request {
    pub fn parse(value: Value) -> Result<Self, WireError> {
        match value {
            Value::Str(verb) => Ok(Request { verb, argument: Value::Null }),
            Value::Map(mut map) => {
                let key = map.iter().next().map(|(k, _)| k.to_string());
                let Some(key) = key else {
                    return Err(WireError::InvalidTag(0));
                };
                let argument = map.remove(&key).unwrap_or(Value::Null);
                Ok(Request { verb: key, argument })
            }
            _ => Err(WireError::InvalidTag(0)),
        }
    }
}

/// Wraps a reply value together with the errno-shaped status spec.md §7
/// assigns every verb, as a one-entry mapping `{"status": code, "reply": value}`
/// would be redundant when the reply carries its own error — verbs that
/// only ever report success/failure reply with the bare integer code;
/// verbs that carry data on success reply with that data directly and
/// signal failure by replying with `Value::Int(code)` instead. Callers
/// distinguish the two by the verb they sent.
pub fn errno_reply(code: i32) -> Value {
    Value::Int(code as i64)
}

pub fn mapping_of(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = Mapping::new();
    for (k, v) in pairs {
        map.insert(k, v);
    }
    Value::Map(map)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
