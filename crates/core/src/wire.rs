// SPDX-License-Identifier: MIT

//! Byte-level codec for [`Value`](crate::value::Value).
//!
//! This module only deals with in-memory bytes and descriptor handles; it
//! knows nothing about sockets or ancillary data. `encode` consumes a tree
//! and returns the in-band payload plus the descriptors it carried, in the
//! order they appear in the tree; `decode` is handed the payload and that
//! same descriptor list back (after the caller has received them via
//! `SCM_RIGHTS` or similar) and reassembles the tree, installing each
//! descriptor into the slot a placeholder tag reserved for it. Host
//! endianness is used throughout: per spec.md §6 this wire format is only
//! ever exchanged between processes on the same host.

use std::os::fd::OwnedFd;

use crate::value::{Mapping, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("message truncated")]
    Truncated,
    #[error("invalid tag byte {0}")]
    InvalidTag(u8),
    #[error("string is not valid utf-8")]
    InvalidUtf8,
    #[error("fd slot {0} has no corresponding descriptor")]
    MissingFd(usize),
}

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_STR: u8 = 4;
const TAG_BYTES: u8 = 5;
const TAG_FD: u8 = 6;
const TAG_PORT: u8 = 7;
const TAG_ARRAY: u8 = 8;
const TAG_MAP: u8 = 9;

/// Encodes `value`, consuming it. Returns the in-band payload and the
/// descriptors it carried, in tree order.
pub fn encode(value: Value) -> (Vec<u8>, Vec<OwnedFd>) {
    let mut buf = Vec::new();
    let mut fds = Vec::new();
    encode_into(value, &mut buf, &mut fds);
    (buf, fds)
}

fn encode_into(value: Value, buf: &mut Vec<u8>, fds: &mut Vec<OwnedFd>) {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(b as u8);
        }
        Value::Int(i) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&i.to_ne_bytes());
        }
        Value::Float(f) => {
            buf.push(TAG_FLOAT);
            buf.extend_from_slice(&f.to_ne_bytes());
        }
        Value::Str(s) => {
            buf.push(TAG_STR);
            buf.extend_from_slice(&(s.len() as u32).to_ne_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            buf.push(TAG_BYTES);
            buf.extend_from_slice(&(b.len() as u32).to_ne_bytes());
            buf.extend_from_slice(&b);
        }
        Value::Fd(fd) => {
            buf.push(TAG_FD);
            buf.extend_from_slice(&(fds.len() as u32).to_ne_bytes());
            fds.push(fd);
        }
        Value::Port(p) => {
            buf.push(TAG_PORT);
            buf.extend_from_slice(&p.to_ne_bytes());
        }
        Value::Array(items) => {
            buf.push(TAG_ARRAY);
            buf.extend_from_slice(&(items.len() as u32).to_ne_bytes());
            for item in items {
                encode_into(item, buf, fds);
            }
        }
        Value::Map(map) => {
            buf.push(TAG_MAP);
            buf.extend_from_slice(&(map.len() as u32).to_ne_bytes());
            for (k, v) in map.iter() {
                buf.extend_from_slice(&(k.len() as u32).to_ne_bytes());
                buf.extend_from_slice(k.as_bytes());
                encode_into(v, buf, fds);
            }
        }
    }
}

/// Decodes a payload previously produced by [`encode`]. `fds` must be the
/// descriptor list that accompanied the payload out-of-band, in the same
/// order `encode` returned them; each is consumed at most once.
pub fn decode(buf: &[u8], mut fds: Vec<Option<OwnedFd>>) -> Result<Value, WireError> {
    let mut cursor = Cursor { buf, pos: 0 };
    decode_value(&mut cursor, &mut fds)
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.pos + n > self.buf.len() {
            return Err(WireError::Truncated);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn take_u32(&mut self) -> Result<u32, WireError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().map_err(|_| WireError::Truncated)?;
        Ok(u32::from_ne_bytes(bytes))
    }

    fn take_i64(&mut self) -> Result<i64, WireError> {
        let bytes: [u8; 8] = self.take(8)?.try_into().map_err(|_| WireError::Truncated)?;
        Ok(i64::from_ne_bytes(bytes))
    }

    fn take_f64(&mut self) -> Result<f64, WireError> {
        let bytes: [u8; 8] = self.take(8)?.try_into().map_err(|_| WireError::Truncated)?;
        Ok(f64::from_ne_bytes(bytes))
    }

    fn take_string(&mut self) -> Result<String, WireError> {
        let len = self.take_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }
}

fn decode_value(cursor: &mut Cursor<'_>, fds: &mut Vec<Option<OwnedFd>>) -> Result<Value, WireError> {
    let tag = cursor.take_u8()?;
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_BOOL => Ok(Value::Bool(cursor.take_u8()? != 0)),
        TAG_INT => Ok(Value::Int(cursor.take_i64()?)),
        TAG_FLOAT => Ok(Value::Float(cursor.take_f64()?)),
        TAG_STR => Ok(Value::Str(cursor.take_string()?)),
        TAG_BYTES => {
            let len = cursor.take_u32()? as usize;
            Ok(Value::Bytes(cursor.take(len)?.to_vec()))
        }
        TAG_FD => {
            let slot = cursor.take_u32()? as usize;
            let fd = fds
                .get_mut(slot)
                .and_then(Option::take)
                .ok_or(WireError::MissingFd(slot))?;
            Ok(Value::Fd(fd))
        }
        TAG_PORT => Ok(Value::Port(cursor.take_i64()?)),
        TAG_ARRAY => {
            let len = cursor.take_u32()? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(decode_value(cursor, fds)?);
            }
            Ok(Value::Array(items))
        }
        TAG_MAP => {
            let len = cursor.take_u32()? as usize;
            let mut map = Mapping::new();
            for _ in 0..len {
                let key = cursor.take_string()?;
                let value = decode_value(cursor, fds)?;
                map.insert(key, value);
            }
            Ok(Value::Map(map))
        }
        other => Err(WireError::InvalidTag(other)),
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
