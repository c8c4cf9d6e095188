// SPDX-License-Identifier: MIT

//! Filesystem watch sources for activation: watch-paths and queue
//! directories (spec.md §4.5). Wraps `notify`'s recommended watcher and
//! maps its events onto the vnode-change vocabulary spec.md §6 names
//! (write, extend, delete, rename, revoke, attrib, link) — `notify`
//! doesn't distinguish "extend" from "write" or surface "revoke", so
//! those collapse onto the nearest kind our event loop actually branches
//! on (spec.md §4.5 only distinguishes delete/rename/revoke from
//! everything else for watch-paths, and write/extend/attrib/link from
//! everything else for queue directories).

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};

use notify::{
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use thiserror::Error;
use warden_core::constants::QUEUE_DIR_SCAN_CAP;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch setup failed: {0}")]
    Notify(#[from] notify::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VnodeEvent {
    Write,
    Extend,
    Delete,
    Rename,
    Revoke,
    Attrib,
    Link,
}

impl VnodeEvent {
    /// Whether this event invalidates the open descriptor, per spec.md
    /// §4.5: "on delete/rename/revoke, close the descriptor and mark as
    /// -1; re-open at the next arm cycle."
    pub fn invalidates_descriptor(self) -> bool {
        matches!(self, VnodeEvent::Delete | VnodeEvent::Rename | VnodeEvent::Revoke)
    }

    fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(VnodeEvent::Link),
            EventKind::Modify(notify::event::ModifyKind::Data(_)) => Some(VnodeEvent::Write),
            EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => Some(VnodeEvent::Attrib),
            EventKind::Modify(notify::event::ModifyKind::Name(_)) => Some(VnodeEvent::Rename),
            EventKind::Remove(_) => Some(VnodeEvent::Delete),
            _ => None,
        }
    }
}

/// An armed watch: the live `notify` watcher (dropping it disarms) plus
/// the channel its events land on.
pub struct ArmedWatch {
    _watcher: RecommendedWatcher,
    events: Receiver<VnodeEvent>,
}

impl ArmedWatch {
    /// Non-blocking drain of every event queued since the last poll.
    pub fn poll(&self) -> Vec<VnodeEvent> {
        self.events.try_iter().collect()
    }
}

/// Arms a watch on `path`. Non-recursive: queue directories and
/// watch-paths are both single filesystem entries per spec.md §3.
pub fn arm(path: &Path) -> Result<ArmedWatch, WatchError> {
    let (tx, rx) = channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            if let Some(mapped) = VnodeEvent::from_notify(&event.kind) {
                let _ = tx.send(mapped);
            }
        }
    })?;
    watcher.watch(path, RecursiveMode::NonRecursive)?;
    Ok(ArmedWatch {
        _watcher: watcher,
        events: rx,
    })
}

/// Scans `dir` for non-hidden entries, stopping after `QUEUE_DIR_SCAN_CAP`
/// entries and reporting whether that cap was hit — SPEC_FULL.md's
/// bounded answer to spec.md §9's "unbounded for very large directories"
/// open question. A cap-truncated scan is still reported non-empty (the
/// activation decision spec.md §4.5 cares about is never wrong; only the
/// count, which nothing here needs, would be).
pub struct DirScan {
    pub non_empty: bool,
    pub truncated: bool,
}

pub fn scan_queue_directory(dir: &Path) -> std::io::Result<DirScan> {
    let mut count = 0usize;
    let mut non_empty = false;
    let entries = std::fs::read_dir(dir)?;
    for entry in entries {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        non_empty = true;
        count += 1;
        if count >= QUEUE_DIR_SCAN_CAP {
            return Ok(DirScan {
                non_empty,
                truncated: true,
            });
        }
    }
    Ok(DirScan {
        non_empty,
        truncated: false,
    })
}

pub fn canonical_or_self(path: &str) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path))
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
