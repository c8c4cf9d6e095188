// SPDX-License-Identifier: MIT

//! Exit classification and the throttle timing policy, per spec.md §4.6.
//!
//! Kept free of any syscall dependency (no `nix`, no `libc`) so it can be
//! unit-tested as pure data-in data-out logic; `warden-engine`'s reaper
//! maps a `nix::sys::wait::WaitStatus` into [`Disposition`] and calls
//! through to [`classify`] and [`apply_timing_policy`].

use std::time::Duration;

use crate::constants::{FAILED_EXITS_THRESHOLD, MIN_JOB_RUN_TIME, REWARD_JOB_RUN_TIME};

const SIGKILL: i32 = 9;
const SIGTERM: i32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Exited(i32),
    Signaled(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapClass {
    /// Clean exit(0), or signaled by SIGKILL/SIGTERM (assumed orderly).
    Neutral,
    /// Non-zero exit, or signaled by anything else.
    Bad,
}

pub fn classify(disposition: Disposition) -> ReapClass {
    match disposition {
        Disposition::Exited(0) => ReapClass::Neutral,
        Disposition::Exited(_) => ReapClass::Bad,
        Disposition::Signaled(sig) if sig == SIGKILL || sig == SIGTERM => ReapClass::Neutral,
        Disposition::Signaled(_) => ReapClass::Bad,
    }
}

/// The outcome of applying spec.md §4.6's timing policy to one reap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingOutcome {
    pub failed_exits: u32,
    pub throttle: bool,
}

/// Applies the timing policy. Only meaningful when `on_demand` is false;
/// callers should not call this for on-demand jobs (their activation
/// sources simply re-arm regardless of timing).
///
/// Reset-before-increment ordering matters: a bad exit at or above
/// `REWARD_JOB_RUN_TIME` must observe `failed_exits == 1` afterward, not
/// `previous + 1` then reset to 0 (spec.md §8's testable property).
pub fn apply_timing_policy(
    time_alive: Duration,
    class: ReapClass,
    mut failed_exits: u32,
) -> TimingOutcome {
    if time_alive >= REWARD_JOB_RUN_TIME {
        failed_exits = 0;
    }

    let too_short = time_alive < MIN_JOB_RUN_TIME;
    if class == ReapClass::Bad || too_short {
        failed_exits += 1;
    }

    TimingOutcome {
        failed_exits,
        throttle: too_short,
    }
}

pub fn exceeds_failure_threshold(failed_exits: u32) -> bool {
    failed_exits >= FAILED_EXITS_THRESHOLD
}

#[cfg(test)]
#[path = "reap_tests.rs"]
mod tests;
