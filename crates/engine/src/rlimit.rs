// SPDX-License-Identifier: MIT

//! Resource-limit cache: a mirror of the supervisor's own process-wide
//! rlimits, kept in sync with the kernel on every change (spec.md §4.9).

use std::collections::BTreeMap;

use nix::sys::resource::{getrlimit, setrlimit, Resource};
use warden_core::constants::PROCESS_MAX_CEILING;
use warden_core::ErrorKind;

/// The resource-limit kinds the manifest's soft/hard resource-limit
/// mappings can name (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RlimitKind {
    Core,
    Cpu,
    Data,
    FileSize,
    MemoryLock,
    NumberOfFiles,
    NumberOfProcesses,
    ResidentSetSize,
    Stack,
}

impl RlimitKind {
    pub fn from_manifest_key(key: &str) -> Option<Self> {
        Some(match key {
            "core" => RlimitKind::Core,
            "cpu" => RlimitKind::Cpu,
            "data" => RlimitKind::Data,
            "file-size" => RlimitKind::FileSize,
            "memory-lock" => RlimitKind::MemoryLock,
            "number-of-files" => RlimitKind::NumberOfFiles,
            "number-of-processes" => RlimitKind::NumberOfProcesses,
            "resident-set-size" => RlimitKind::ResidentSetSize,
            "stack" => RlimitKind::Stack,
            _ => return None,
        })
    }

    pub fn as_manifest_key(self) -> &'static str {
        match self {
            RlimitKind::Core => "core",
            RlimitKind::Cpu => "cpu",
            RlimitKind::Data => "data",
            RlimitKind::FileSize => "file-size",
            RlimitKind::MemoryLock => "memory-lock",
            RlimitKind::NumberOfFiles => "number-of-files",
            RlimitKind::NumberOfProcesses => "number-of-processes",
            RlimitKind::ResidentSetSize => "resident-set-size",
            RlimitKind::Stack => "stack",
        }
    }

    pub(crate) fn resource(self) -> Resource {
        match self {
            RlimitKind::Core => Resource::RLIMIT_CORE,
            RlimitKind::Cpu => Resource::RLIMIT_CPU,
            RlimitKind::Data => Resource::RLIMIT_DATA,
            RlimitKind::FileSize => Resource::RLIMIT_FSIZE,
            RlimitKind::MemoryLock => Resource::RLIMIT_MEMLOCK,
            RlimitKind::NumberOfFiles => Resource::RLIMIT_NOFILE,
            RlimitKind::NumberOfProcesses => Resource::RLIMIT_NPROC,
            RlimitKind::ResidentSetSize => Resource::RLIMIT_RSS,
            RlimitKind::Stack => Resource::RLIMIT_STACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RlimitPair {
    pub soft: u64,
    pub hard: u64,
}

/// Mirror of the process's own rlimits. `get_rlimits` serves straight from
/// the mirror; `set_rlimits` writes through to the kernel and re-reads
/// (the kernel may clamp further than requested).
#[derive(Default)]
pub struct RlimitCache {
    mirror: BTreeMap<RlimitKind, RlimitPair>,
}

impl RlimitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the mirror by reading every known limit kind from the
    /// kernel. Called once at startup.
    pub fn refresh_all(&mut self) -> Result<(), ErrorKind> {
        let kinds = [
            RlimitKind::Core,
            RlimitKind::Cpu,
            RlimitKind::Data,
            RlimitKind::FileSize,
            RlimitKind::MemoryLock,
            RlimitKind::NumberOfFiles,
            RlimitKind::NumberOfProcesses,
            RlimitKind::ResidentSetSize,
            RlimitKind::Stack,
        ];
        for kind in kinds {
            self.refresh_one(kind)?;
        }
        Ok(())
    }

    fn refresh_one(&mut self, kind: RlimitKind) -> Result<RlimitPair, ErrorKind> {
        let (soft, hard) = getrlimit(kind.resource()).map_err(|e| ErrorKind::transient(e as i32))?;
        let pair = RlimitPair { soft, hard };
        self.mirror.insert(kind, pair);
        Ok(pair)
    }

    pub fn get(&self) -> &BTreeMap<RlimitKind, RlimitPair> {
        &self.mirror
    }

    /// Applies a requested change: clamps the process-count ceiling per
    /// spec.md §4.9, calls `setrlimit`, then re-reads into the mirror.
    ///
    /// System-wide kernel-knob adjustment (the file-descriptor maximum,
    /// the process maximum) is left to the host's own sysctl layer on
    /// platforms without a stable Rust-facing API for it; this cache only
    /// ever adjusts its own process's limits, consistent with spec.md §9
    /// treating the "running as the system supervisor" branch as an
    /// external collaborator concern.
    pub fn set(&mut self, kind: RlimitKind, mut requested: RlimitPair) -> Result<RlimitPair, ErrorKind> {
        if kind == RlimitKind::NumberOfProcesses {
            requested.hard = requested.hard.min(PROCESS_MAX_CEILING);
            requested.soft = requested.soft.min(requested.hard);
        }

        setrlimit(kind.resource(), requested.soft, requested.hard)
            .map_err(|e| ErrorKind::transient(e as i32))?;

        self.refresh_one(kind)
    }
}

#[cfg(test)]
#[path = "rlimit_tests.rs"]
mod tests;
