// SPDX-License-Identifier: MIT

//! Tunables shared by the registry, the reaper, and the activation sources.

use std::time::Duration;

/// Below this runtime a clean or dirty exit still throttles the job.
pub const MIN_JOB_RUN_TIME: Duration = Duration::from_secs(10);

/// At or above this runtime, `failed_exits` resets to zero on the next reap.
pub const REWARD_JOB_RUN_TIME: Duration = Duration::from_secs(60);

/// `failed_exits` reaching this value removes the job at the next reap.
pub const FAILED_EXITS_THRESHOLD: u32 = 10;

/// Hard ceiling on the process-count resource limit, regardless of request.
pub const PROCESS_MAX_CEILING: u64 = 2068;

/// Idle-exit timeout: with an empty registry and nothing on-demand armed,
/// the supervisor exits successfully after this much silence.
pub const IDLE_EXIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Queue directories are scanned for emptiness at most this many entries
/// deep; see SPEC_FULL.md's note on unbounded directory scans.
pub const QUEUE_DIR_SCAN_CAP: usize = 4096;
