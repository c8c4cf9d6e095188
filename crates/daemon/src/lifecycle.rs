// SPDX-License-Identifier: MIT

//! Startup and shutdown sequencing for the control-socket directory, per
//! spec.md §6: create the directory (mode 0700), acquire an exclusive
//! advisory lock on it before touching anything else, write the version
//! marker, and bind the socket last, only once every earlier step has
//! succeeded. A second `wardend` invocation against the same state
//! directory fails at the lock and leaves every file it finds untouched.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::PathBuf;

use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;

use crate::env;

pub const SOCKET_NAME: &str = "sock";
const LOCK_NAME: &str = "lock";
const VERSION_NAME: &str = "wardend.version";
const LOG_NAME: &str = "wardend.log";
const DIR_MODE: u32 = 0o700;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine a state directory")]
    NoStateDir,
    #[error("another wardend already holds the lock on {0}")]
    LockFailed(PathBuf),
    #[error("failed to bind control socket at {0}: {1}")]
    BindFailed(PathBuf, io::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Paths derived from one state directory, mirroring the way every other
/// path here hangs off a single resolved root.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        Ok(Self {
            socket_path: state_dir.join(SOCKET_NAME),
            lock_path: state_dir.join(LOCK_NAME),
            version_path: state_dir.join(VERSION_NAME),
            log_path: state_dir.join(LOG_NAME),
            state_dir,
        })
    }
}

/// Everything startup hands back to `main`: the held lock file (dropping
/// it releases the advisory lock, so it must outlive the process) and the
/// bound listener.
pub struct StartupResult {
    pub listener: UnixListener,
    pub lock_file: File,
}

/// Runs the startup sequence. On any failure other than [`LifecycleError::LockFailed`],
/// removes whatever files this attempt created before returning — those
/// files belong to nobody. On `LockFailed`, leaves everything alone: it
/// belongs to the daemon instance that is already running.
pub fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config) {
        Ok(result) => Ok(result),
        Err(err @ LifecycleError::LockFailed(_)) => Err(err),
        Err(err) => {
            cleanup_on_failure(config);
            Err(err)
        }
    }
}

fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(&config.state_dir)?;

    // Opened without truncation: truncating before the lock is acquired
    // would wipe the pid of a daemon that is still running and holding it.
    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| LifecycleError::LockFailed(config.lock_path.clone()))?;

    // Only now, with the lock held, is it safe to overwrite the pid.
    lock_file.set_len(0)?;
    std::io::Write::write_all(&mut &lock_file, std::process::id().to_string().as_bytes())?;

    std::fs::write(&config.version_path, version_marker())?;

    // Bind last: every earlier step is cheap to undo, a bound socket
    // published to clients is not.
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;
    std::fs::set_permissions(
        &config.socket_path,
        std::os::unix::fs::PermissionsExt::from_mode(0o700),
    )?;

    Ok(StartupResult { listener, lock_file })
}

fn cleanup_on_failure(config: &Config) {
    for path in [&config.socket_path, &config.version_path, &config.lock_path] {
        let _ = std::fs::remove_file(path);
    }
}

/// Removes the socket and version files on a clean shutdown. The lock
/// file is left in place; dropping `lock_file` releases the advisory lock
/// and the next startup truncates it in place.
pub fn shutdown(config: &Config) {
    let _ = std::fs::remove_file(&config.socket_path);
    let _ = std::fs::remove_file(&config.version_path);
}

fn version_marker() -> String {
    format!("wardend {}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
