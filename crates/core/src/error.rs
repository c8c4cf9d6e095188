// SPDX-License-Identifier: MIT

//! Error kinds surfaced to IPC clients, per the verb reply contract.

use thiserror::Error;

/// The supervisor's public error vocabulary. Every verb reply either
/// carries `None` (success) or one of these, generally rendered to the
/// client as the matching errno-shaped integer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No record with that label.
    #[error("no such job")]
    NotFound,

    /// A record with that label is already present.
    #[error("job already exists")]
    Exists,

    /// Missing required manifest key, malformed message, or type mismatch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Check-in attempted on a connection that isn't the job's trusted fd.
    #[error("permission denied")]
    PermissionDenied,

    /// No handler registered for the verb.
    #[error("not implemented")]
    NotImplemented,

    /// A syscall failed; the wrapped value is the raw errno.
    #[error("transient failure (errno {0})")]
    Transient(i32),

    /// Success. Spelled out so replies can always carry an `ErrorKind`.
    #[error("ok")]
    None,
}

impl ErrorKind {
    /// The wire-visible code for this error kind: 0 for success, otherwise
    /// the closest POSIX errno (spec.md §7's "errno" reply convention).
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::None => 0,
            ErrorKind::NotFound => libc_enoent(),
            ErrorKind::Exists => libc_eexist(),
            ErrorKind::InvalidArgument(_) => libc_einval(),
            ErrorKind::PermissionDenied => libc_eperm(),
            ErrorKind::NotImplemented => libc_enosys(),
            ErrorKind::Transient(errno) => *errno,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ErrorKind::None)
    }

    pub fn transient(errno: i32) -> Self {
        ErrorKind::Transient(errno)
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ErrorKind::InvalidArgument(msg.into())
    }
}

// Kept as free functions (rather than a libc dependency) so warden-core
// stays off the syscall-facing crates; the numeric values are POSIX-fixed
// on every platform this supervisor targets.
fn libc_enoent() -> i32 {
    2
}
fn libc_eperm() -> i32 {
    1
}
fn libc_eexist() -> i32 {
    17
}
fn libc_einval() -> i32 {
    22
}
fn libc_enosys() -> i32 {
    38
}

pub type Result<T> = std::result::Result<T, ErrorKind>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
