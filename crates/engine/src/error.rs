// SPDX-License-Identifier: MIT

//! Engine-level errors: everything that isn't already one of spec.md
//! §7's public `ErrorKind` variants gets mapped down to `Transient` at
//! the boundary a caller (warden-daemon) actually surfaces to a client.

use thiserror::Error;
use warden_core::ErrorKind;

use crate::activation::ActivationError;
use crate::launcher::LaunchError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Activation(#[from] ActivationError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Job(#[from] ErrorKind),
}

impl From<EngineError> for ErrorKind {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Job(kind) => kind,
            EngineError::Launch(LaunchError::Fork(errno)) => ErrorKind::transient(errno as i32),
            EngineError::Launch(LaunchError::Pipe(errno)) => ErrorKind::transient(errno as i32),
            EngineError::Activation(_) => ErrorKind::transient(libc::EIO),
            EngineError::Io(e) => ErrorKind::transient(e.raw_os_error().unwrap_or(libc::EIO)),
        }
    }
}
