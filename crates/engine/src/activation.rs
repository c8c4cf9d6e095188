// SPDX-License-Identifier: MIT

//! Activation-source arm/disarm machinery (spec.md §4.5): building the
//! descriptors and watches a `Watching` job needs, and tearing them down
//! again on disarm or removal. Readiness itself (a socket becoming
//! readable, a timer's deadline passing) is polled by `warden-daemon`'s
//! event loop; this module only owns what gets armed and how it's torn
//! down, keeping `warden-engine` free of an async runtime dependency.
//!
//! Sockets and filesystem watches have different lifetimes (spec.md §3):
//! a listening socket is opened once across the job's whole life and
//! closed only on removal — it stays open and inherited by every child
//! the job launches, so `disarm_watches` never touches it. A watch-path
//! or queue-directory descriptor, by contrast, is closed and reopened on
//! every arm cycle.

use std::collections::HashMap;
use std::os::fd::{OwnedFd, RawFd};

use warden_adapters::{socket, watch, VnodeEvent};
use warden_core::job::Job;
use warden_core::value::Value;

/// Everything held for one job across its activation lifecycle.
#[derive(Default)]
struct JobActivation {
    sockets: Vec<(String, Vec<OwnedFd>)>,
    watch_paths: Vec<Option<watch::ArmedWatch>>,
    queue_dirs: Vec<Option<watch::ArmedWatch>>,
}

impl JobActivation {
    fn socket_fds(&self) -> Vec<RawFd> {
        use std::os::fd::AsRawFd;
        self.sockets
            .iter()
            .flat_map(|(_, fds)| fds.iter().map(|f| f.as_raw_fd()))
            .collect()
    }
}

/// Table of activation state, keyed by job label.
#[derive(Default)]
pub struct ActivationTable {
    jobs: HashMap<String, JobActivation>,
}

#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    #[error(transparent)]
    Socket(#[from] socket::SocketError),
    #[error(transparent)]
    Watch(#[from] watch::WatchError),
}

impl ActivationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens every socket group declared in `job`'s manifest, once. A
    /// second call for the same label is a no-op — the descriptors stay
    /// open across every Watching/Starting/Running cycle until
    /// [`ActivationTable::remove`].
    pub fn ensure_sockets(&mut self, job: &Job) -> Result<(), ActivationError> {
        let label = job.label.as_str();
        if self.jobs.get(label).is_some_and(|j| !j.sockets.is_empty()) {
            return Ok(());
        }

        let mut sockets = Vec::new();
        if let Some(map) = job.manifest.as_map() {
            for (name, specs) in socket::parse_socket_groups(map)? {
                let mut fds = Vec::with_capacity(specs.len());
                for spec in &specs {
                    fds.push(socket::open(spec)?);
                }
                sockets.push((name, fds));
            }
        }

        self.jobs.entry(label.to_string()).or_default().sockets = sockets;
        Ok(())
    }

    /// Arms watch-paths and queue-directories for `job`. Returns whether
    /// a queue directory was found non-empty at arm time — per spec.md
    /// §4.5, that's enough to activate immediately without waiting for a
    /// filesystem event.
    pub fn arm_watches(&mut self, job: &Job) -> Result<bool, ActivationError> {
        let mut watch_paths = Vec::with_capacity(job.watch_paths.len());
        for slot in &job.watch_paths {
            let path = watch::canonical_or_self(&slot.path);
            watch_paths.push(watch::arm(&path).ok());
        }

        let mut queue_dirs = Vec::with_capacity(job.queue_directories.len());
        let mut queue_dir_already_active = false;
        for slot in &job.queue_directories {
            let path = watch::canonical_or_self(&slot.path);
            if let Ok(scan) = watch::scan_queue_directory(&path) {
                if scan.non_empty {
                    queue_dir_already_active = true;
                }
            }
            queue_dirs.push(watch::arm(&path).ok());
        }

        let entry = self.jobs.entry(job.label.as_str().to_string()).or_default();
        entry.watch_paths = watch_paths;
        entry.queue_dirs = queue_dirs;
        Ok(queue_dir_already_active)
    }

    /// Closes (and drops) every armed watch-path/queue-directory
    /// descriptor for `label`, leaving its sockets untouched.
    pub fn disarm_watches(&mut self, label: &str) {
        if let Some(entry) = self.jobs.get_mut(label) {
            entry.watch_paths.clear();
            entry.queue_dirs.clear();
        }
    }

    /// Full teardown on job removal: closes sockets too.
    pub fn remove(&mut self, label: &str) {
        self.jobs.remove(label);
    }

    /// Raw socket fds currently open for `label`, for the launcher to
    /// inherit into the child.
    pub fn socket_fds(&self, label: &str) -> Vec<RawFd> {
        self.jobs.get(label).map(JobActivation::socket_fds).unwrap_or_default()
    }

    /// The job label whose socket set contains `fd`, if any.
    pub fn label_for_socket_fd(&self, fd: RawFd) -> Option<&str> {
        self.jobs
            .iter()
            .find(|(_, activation)| activation.socket_fds().contains(&fd))
            .map(|(label, _)| label.as_str())
    }

    /// Non-blocking drain of watch-path events for `label`. Each element
    /// is `(slot_index, events)`.
    pub fn poll_watch_paths(&self, label: &str) -> Vec<(usize, Vec<VnodeEvent>)> {
        let Some(activation) = self.jobs.get(label) else {
            return Vec::new();
        };
        activation
            .watch_paths
            .iter()
            .enumerate()
            .filter_map(|(i, w)| w.as_ref().map(|w| (i, w.poll())))
            .filter(|(_, events)| !events.is_empty())
            .collect()
    }

    pub fn poll_queue_dirs(&self, label: &str) -> Vec<(usize, Vec<VnodeEvent>)> {
        let Some(activation) = self.jobs.get(label) else {
            return Vec::new();
        };
        activation
            .queue_dirs
            .iter()
            .enumerate()
            .filter_map(|(i, w)| w.as_ref().map(|w| (i, w.poll())))
            .filter(|(_, events)| !events.is_empty())
            .collect()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }
}

/// Extracts the five-field calendar spec from a manifest's
/// `start-calendar-interval` mapping, per spec.md §3 and §4.7.
pub fn parse_calendar_interval(manifest: &Value) -> Option<warden_core::CalendarSpec> {
    let map = manifest.as_map()?.get("start-calendar-interval")?.as_map()?;
    let field = |key: &str| map.get(key).and_then(Value::as_int).map(|v| v as u32);
    // weekday 0-6, with 7 also meaning Sunday (0), per spec.md §4.7.
    let weekday = field("weekday").map(|w| if w == 7 { 0 } else { w });
    let spec = warden_core::CalendarSpec {
        month: field("month"),
        day_of_month: field("day"),
        weekday,
        hour: field("hour"),
        minute: field("minute"),
    };
    if spec == warden_core::CalendarSpec::default() {
        None
    } else {
        Some(spec)
    }
}

#[cfg(test)]
#[path = "activation_tests.rs"]
mod tests;
