// SPDX-License-Identifier: MIT

//! State-directory resolution: `WARDEND_STATE_DIR`, then
//! `XDG_STATE_HOME`, then `$HOME/.local/state`, per SPEC_FULL.md's
//! ambient-stack section.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

const SUBDIR: &str = "wardend";

pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("WARDEND_STATE_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join(SUBDIR));
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".local").join("state").join(SUBDIR))
        .ok_or(LifecycleError::NoStateDir)
}

/// Override for the event loop's timer-check cadence, in milliseconds.
/// Absent unless `WARDEND_TIMER_CHECK_MS` is set to a valid integer.
pub fn timer_check_ms() -> Option<u64> {
    std::env::var("WARDEND_TIMER_CHECK_MS").ok()?.parse().ok()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
