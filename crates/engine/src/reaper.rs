// SPDX-License-Identifier: MIT

//! Collecting a dead child's exit status (spec.md §4.3's Reaping state,
//! §4.6's classification). This module only calls `waitpid` and maps the
//! result onto [`warden_core::reap::Disposition`]; the timing policy and
//! state-machine branch selection live in [`crate::supervisor`].

use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use warden_core::reap::Disposition;

/// One completed reap: which pid, and how it ended.
#[derive(Debug, Clone, Copy)]
pub struct ReapedChild {
    pub pid: i32,
    pub disposition: Disposition,
}

/// Drains every child exit currently reapable without blocking. Several
/// may be ready in one event-loop tick if SIGCHLD coalesced them.
pub fn reap_available() -> Vec<ReapedChild> {
    let mut reaped = Vec::new();
    loop {
        match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(pid, code)) => reaped.push(ReapedChild {
                pid: pid.as_raw(),
                disposition: Disposition::Exited(code),
            }),
            Ok(WaitStatus::Signaled(pid, sig, _)) => reaped.push(ReapedChild {
                pid: pid.as_raw(),
                disposition: Disposition::Signaled(sig as i32),
            }),
            Ok(WaitStatus::StillAlive) | Err(nix::errno::Errno::ECHILD) => break,
            Ok(_) => continue,
            Err(_) => break,
        }
    }
    reaped
}

/// Reaps one specific pid, discarding the status — used for the
/// transient reaper spec.md §4.2 installs when a job is removed while
/// its child is still alive: the record is already gone, so there's
/// nothing left to update.
pub fn reap_discard(pid: i32) {
    let _ = waitpid(Pid::from_raw(pid), Some(WaitPidFlag::WNOHANG));
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
