// SPDX-License-Identifier: MIT

//! Builds listening (or connected) descriptors from a job manifest's
//! `sockets` mapping, per spec.md §4.5's activation sources and §9's note
//! that "a passive-vs-connect socket flag ... [is] part of activation-
//! source setup and not core state-machine behavior".
//!
//! Descriptors built here are handed to the engine as `OwnedFd`s; the
//! supervisor owns them until the job that references them is removed
//! (spec.md §3's invariant on owned listening sockets).

use std::os::fd::OwnedFd;
use std::os::unix::net::UnixListener as StdUnixListener;
use std::path::Path;

use nix::sys::socket::{
    bind, connect, listen, socket, AddressFamily, Backlog, SockFlag, SockType, SockaddrIn,
    UnixAddr,
};
use thiserror::Error;
use warden_core::value::{Mapping, Value};

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket group '{0}' has no entries")]
    Empty(String),
    #[error("socket entry missing required key '{0}'")]
    MissingKey(&'static str),
    #[error("unsupported socket type '{0}'")]
    UnsupportedType(String),
    #[error("syscall failed: {0}")]
    Errno(#[from] nix::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub enum SocketKind {
    UnixStream { pathname: String },
    TcpStream { node: String, service: u16 },
}

#[derive(Debug, Clone)]
pub struct SocketSpec {
    pub kind: SocketKind,
    /// `false` means the entry describes an already-connected peer rather
    /// than something to listen on (spec.md §4.5).
    pub passive: bool,
}

/// Parses every socket group under the manifest's `sockets` mapping.
/// Group name -> the specs within it, backlog-ordered as they appeared.
pub fn parse_socket_groups(manifest: &Mapping) -> Result<Vec<(String, Vec<SocketSpec>)>, SocketError> {
    let Some(sockets) = manifest.get("sockets").and_then(Value::as_map) else {
        return Ok(Vec::new());
    };

    let mut groups = Vec::new();
    for (name, value) in sockets.iter() {
        let entries = match value {
            Value::Array(items) => items.iter().map(parse_entry).collect::<Result<Vec<_>, _>>()?,
            Value::Map(_) => vec![parse_entry(value)?],
            _ => return Err(SocketError::MissingKey("type")),
        };
        if entries.is_empty() {
            return Err(SocketError::Empty(name.to_string()));
        }
        groups.push((name.to_string(), entries));
    }
    Ok(groups)
}

fn parse_entry(value: &Value) -> Result<SocketSpec, SocketError> {
    let map = value.as_map().ok_or(SocketError::MissingKey("type"))?;
    let ty = map
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("stream");
    let passive = map.get("passive").and_then(Value::as_bool).unwrap_or(true);

    if let Some(pathname) = map.get("pathname").and_then(Value::as_str) {
        if ty != "stream" {
            return Err(SocketError::UnsupportedType(ty.to_string()));
        }
        return Ok(SocketSpec {
            kind: SocketKind::UnixStream {
                pathname: pathname.to_string(),
            },
            passive,
        });
    }

    if let (Some(node), Some(service)) = (
        map.get("node-name").and_then(Value::as_str),
        map.get("service-name").and_then(Value::as_int),
    ) {
        if ty != "stream" {
            return Err(SocketError::UnsupportedType(ty.to_string()));
        }
        return Ok(SocketSpec {
            kind: SocketKind::TcpStream {
                node: node.to_string(),
                service: service as u16,
            },
            passive,
        });
    }

    Err(SocketError::MissingKey("pathname"))
}

/// Opens the descriptor for one spec: binds and listens when `passive`,
/// connects when not. The caller registers the result for fd-readable
/// events (spec.md §4.5).
pub fn open(spec: &SocketSpec) -> Result<OwnedFd, SocketError> {
    match (&spec.kind, spec.passive) {
        (SocketKind::UnixStream { pathname }, true) => open_unix_listener(pathname),
        (SocketKind::UnixStream { pathname }, false) => open_unix_connect(pathname),
        (SocketKind::TcpStream { node, service }, true) => open_tcp_listener(node, *service),
        (SocketKind::TcpStream { node, service }, false) => open_tcp_connect(node, *service),
    }
}

fn open_unix_listener(pathname: &str) -> Result<OwnedFd, SocketError> {
    let path = Path::new(pathname);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    // `std::os::unix::net::UnixListener` gets us backlog defaults and
    // `bind`+`listen` in one call; we only reach for raw `nix` sockets
    // when the manifest needs something std doesn't expose (TCP here).
    let listener = StdUnixListener::bind(path)?;
    listener.set_nonblocking(true)?;
    Ok(listener.into())
}

fn open_unix_connect(pathname: &str) -> Result<OwnedFd, SocketError> {
    let fd = socket(
        AddressFamily::Unix,
        SockType::Stream,
        SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC,
        None,
    )?;
    let addr = UnixAddr::new(pathname)?;
    match connect(std::os::fd::AsRawFd::as_raw_fd(&fd), &addr) {
        Ok(()) | Err(nix::Error::EINPROGRESS) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(fd)
}

fn open_tcp_listener(node: &str, service: u16) -> Result<OwnedFd, SocketError> {
    let fd = socket(
        AddressFamily::Inet,
        SockType::Stream,
        SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC,
        None,
    )?;
    let ip: std::net::Ipv4Addr = if node.is_empty() || node == "*" {
        std::net::Ipv4Addr::UNSPECIFIED
    } else {
        node.parse().unwrap_or(std::net::Ipv4Addr::UNSPECIFIED)
    };
    let addr = SockaddrIn::from(std::net::SocketAddrV4::new(ip, service));
    bind(std::os::fd::AsRawFd::as_raw_fd(&fd), &addr)?;
    listen(&fd, Backlog::new(128).unwrap_or(Backlog::MAXCONN))?;
    Ok(fd)
}

fn open_tcp_connect(node: &str, service: u16) -> Result<OwnedFd, SocketError> {
    let fd = socket(
        AddressFamily::Inet,
        SockType::Stream,
        SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC,
        None,
    )?;
    let ip: std::net::Ipv4Addr = node.parse().unwrap_or(std::net::Ipv4Addr::LOCALHOST);
    let addr = SockaddrIn::from(std::net::SocketAddrV4::new(ip, service));
    match connect(std::os::fd::AsRawFd::as_raw_fd(&fd), &addr) {
        Ok(()) | Err(nix::Error::EINPROGRESS) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(fd)
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
