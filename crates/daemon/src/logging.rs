// SPDX-License-Identifier: MIT

//! Log setup: rotation at startup, then a non-blocking file writer under
//! `tracing-subscriber`'s `EnvFilter`. Matches the teacher's daemon's
//! logging shape, since its failure diagnostics (a synchronous write
//! before the non-blocking writer has ever flushed) apply here exactly
//! as they did there.

use std::io::Write;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 3;

/// Shifts `wardend.log` -> `.1` -> `.2` -> `.3` if the current log has
/// grown past `MAX_LOG_SIZE`. Best-effort: a failure here should never
/// keep the daemon from starting.
pub fn rotate_log_if_needed(log_path: &Path) {
    let Ok(metadata) = std::fs::metadata(log_path) else {
        return;
    };
    if metadata.len() < MAX_LOG_SIZE {
        return;
    }

    for n in (1..MAX_ROTATED_LOGS).rev() {
        let from = rotated_path(log_path, n);
        let to = rotated_path(log_path, n + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, rotated_path(log_path, 1));
}

fn rotated_path(log_path: &Path, n: u32) -> std::path::PathBuf {
    let mut name = log_path.as_os_str().to_owned();
    name.push(format!(".{n}"));
    name.into()
}

/// Writes a one-line marker synchronously, for diagnostics visible even
/// if tracing's writer thread hasn't started yet.
pub fn write_startup_marker(log_path: &Path) {
    write_line(log_path, "wardend: starting up");
}

pub fn write_startup_error(log_path: &Path, err: &dyn std::fmt::Display) {
    write_line(log_path, &format!("wardend: startup failed: {err}"));
}

fn write_line(log_path: &Path, line: &str) {
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(log_path) {
        let _ = writeln!(file, "{line}");
    }
}

/// A handle to swap the active `EnvFilter` at runtime, backing the
/// `set-log-mask`/`get-log-mask` IPC verbs (spec.md §4.4).
pub type LogReloadHandle = reload::Handle<EnvFilter, Registry>;

/// Initializes the global `tracing` subscriber. The returned guard must
/// be held for the process lifetime: dropping it stops the non-blocking
/// writer from flushing. The returned handle lets a later IPC verb swap
/// the filter without restarting the process.
pub fn setup_logging(log_path: &Path) -> std::io::Result<(WorkerGuard, LogReloadHandle)> {
    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let file_name = log_path
        .file_name()
        .map(|n| n.to_owned())
        .unwrap_or_else(|| "wardend.log".into());

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, reload_handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok((guard, reload_handle))
}

/// Maps a `set-log-mask` integer onto an `EnvFilter` directive. Higher
/// values are noisier, loosely mirroring the teacher's own mask-to-level
/// convention rather than syslog's bitmask-of-priorities one (the wire
/// verb only ever carries the mask value through, not its interpretation).
pub fn log_mask_to_filter(mask: i32) -> EnvFilter {
    let directive = match mask {
        m if m <= 0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    EnvFilter::new(directive)
}

/// Applies a `set-log-mask` request to the live subscriber.
pub fn apply_log_mask(handle: &LogReloadHandle, mask: i32) -> Result<(), reload::Error> {
    handle.reload(log_mask_to_filter(mask))
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
