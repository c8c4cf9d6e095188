// SPDX-License-Identifier: MIT

//! The job record: immutable identity plus mutable runtime state, per
//! spec.md §3.

use std::os::fd::OwnedFd;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::calendar::CalendarSpec;
use crate::error::ErrorKind;
use crate::value::{Mapping, Value};

crate::define_id! {
    /// A job's label: the registry key, and the only externally stable
    /// handle to a job across the IPC surface.
    pub struct JobId;
}

/// One watched filesystem entry (a watch-path or a queue-directory entry).
/// `descriptor` is `None` when the path has never been opened yet, or was
/// closed after a delete/rename/revoke event and is waiting to be reopened
/// at the next arm cycle (spec.md §3, §4.5).
#[derive(Debug, Default)]
pub struct WatchSlot {
    pub path: String,
    pub descriptor: Option<OwnedFd>,
}

impl WatchSlot {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            descriptor: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.descriptor.is_some()
    }
}

/// A job's position in spec.md §4.3's state machine. The engine crate owns
/// the transition logic; this type is just the label on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Loaded,
    Watching,
    Starting,
    Running,
    Reaping,
    Removed,
}

/// A live child's runtime bookkeeping. Distinct from the manifest (which
/// is immutable once loaded) so that restart doesn't require touching the
/// manifest at all.
#[derive(Debug, Default)]
pub struct RunState {
    /// Positive while a child is alive and not yet reaped.
    pub pid: Option<i32>,
    /// The supervisor's read end of the exec-failure pipe (spec.md §3
    /// calls this "exec_fd"; the child holds the write end and either
    /// writes its `errno` on a failed `execve` or lets it close on a
    /// successful one). Present only between fork and that EOF/errno
    /// read.
    pub exec_fd: Option<OwnedFd>,
    pub start_time: Option<Instant>,
    pub checked_in: bool,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        self.pid.is_some()
    }
}

/// A job record: manifest (immutable once loaded) plus mutable runtime
/// state plus the bookkeeping the reaper and the activation sources need.
#[derive(Debug)]
pub struct Job {
    pub label: JobId,
    /// The full tagged-tree manifest, as submitted. Shared via `Arc` so
    /// that `get-job` can clone the handle instead of deep-copying on
    /// every read; callers that need a client-safe copy still go through
    /// `Value::redact_fds`.
    pub manifest: Arc<Value>,

    pub state: JobState,
    pub run: RunState,

    pub failed_exits: u32,
    pub throttle: bool,
    pub debug: bool,
    pub firstborn: bool,

    pub on_demand: bool,
    pub run_at_load: bool,
    pub service_ipc: bool,

    pub watch_paths: Vec<WatchSlot>,
    pub queue_directories: Vec<WatchSlot>,
    pub start_interval: Option<Duration>,
    pub start_calendar_interval: Option<CalendarSpec>,
}

/// Fields a submitted manifest must carry (spec.md §4.4 submit-job).
const REQUIRED_KEYS: &[&str] = &["program", "program-arguments"];

impl Job {
    /// Validates and builds a job record from a submitted manifest.
    /// Does not touch the filesystem or fork anything; activation sources
    /// and the child launcher are armed/invoked by the engine once the
    /// record is in the registry.
    pub fn from_manifest(manifest: Value) -> Result<Job, ErrorKind> {
        let map: Mapping = match manifest {
            Value::Map(map) => map,
            _ => return Err(ErrorKind::invalid("manifest must be a mapping")),
        };

        let missing = crate::value::missing_keys(&map, REQUIRED_KEYS);
        if missing.len() == REQUIRED_KEYS.len() {
            return Err(ErrorKind::invalid(format!(
                "missing required key(s): {}",
                missing.join(", ")
            )));
        }

        let label = map
            .get("label")
            .and_then(Value::as_str)
            .ok_or_else(|| ErrorKind::invalid("missing required key: label"))?
            .to_string();

        let on_demand = map.get("on-demand").and_then(Value::as_bool).unwrap_or(true);
        let run_at_load = map.get("run-at-load").and_then(Value::as_bool).unwrap_or(false);
        let service_ipc = map.get("service-ipc").and_then(Value::as_bool).unwrap_or(false);

        let start_interval = map.get("start-interval").and_then(Value::as_int).and_then(|secs| {
            if secs <= 0 {
                warn!(label = %label, "start-interval of 0 is rejected, activation source disabled");
                None
            } else {
                Some(Duration::from_secs(secs as u64))
            }
        });

        let watch_paths = string_list(&map, "watch-paths")
            .into_iter()
            .map(WatchSlot::new)
            .collect();
        let queue_directories = string_list(&map, "queue-directories")
            .into_iter()
            .map(WatchSlot::new)
            .collect();

        Ok(Job {
            label: JobId::new(label),
            manifest: Arc::new(Value::Map(map)),
            state: JobState::Loaded,
            run: RunState::default(),
            failed_exits: 0,
            throttle: false,
            debug: false,
            firstborn: false,
            on_demand,
            run_at_load,
            service_ipc,
            watch_paths,
            queue_directories,
            start_interval,
            start_calendar_interval: None,
        })
    }

    /// Whether, per the invariant in spec.md §3, this job's activation
    /// sources are required to be armed right now.
    pub fn wants_activation_armed(&self, shutdown_in_progress: bool) -> bool {
        !self.run.is_running() && self.on_demand && !self.throttle && !shutdown_in_progress
    }

    pub fn has_activation_sources(&self) -> bool {
        self.start_interval.is_some()
            || self.start_calendar_interval.is_some()
            || !self.watch_paths.is_empty()
            || !self.queue_directories.is_empty()
    }
}

fn string_list(map: &Mapping, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
