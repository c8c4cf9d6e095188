// SPDX-License-Identifier: MIT

//! The job registry: label-keyed storage for [`Job`] records, per
//! spec.md §4.2.
//!
//! Kernel event registrations (fd-readable, vnode-change, timer-fire) carry
//! back an opaque handle rather than a raw pointer or index, so that an
//! event which races with a `remove-job` sees a clean `NotFound` instead of
//! touching a dangling or reused slot: each slot carries a generation
//! counter that's bumped on removal, and a [`JobHandle`] embeds the
//! generation it was issued against (spec.md §9's arena note).

use crate::error::ErrorKind;
use crate::job::{Job, JobId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    index: usize,
    generation: u64,
}

struct Slot {
    generation: u64,
    job: Option<Job>,
}

#[derive(Default)]
pub struct Registry {
    slots: Vec<Slot>,
    /// Indices into `slots`, in insertion order, so the firstborn (if any)
    /// stays at the head per spec.md §3.
    order: Vec<usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `job`, failing with [`ErrorKind::Exists`] if its label is
    /// already present. Returns a handle stable across later removals of
    /// other records.
    pub fn insert(&mut self, job: Job) -> Result<JobHandle, ErrorKind> {
        if self.lookup(job.label.as_str()).is_some() {
            return Err(ErrorKind::Exists);
        }
        let index = self.slots.len();
        let generation = 0;
        self.slots.push(Slot {
            generation,
            job: Some(job),
        });
        self.order.push(index);
        Ok(JobHandle { index, generation })
    }

    /// Linear lookup by label, matching spec.md §4.2's stated complexity.
    pub fn lookup(&self, label: &str) -> Option<&Job> {
        self.order
            .iter()
            .filter_map(|&i| self.slots[i].job.as_ref())
            .find(|job| job.label.as_str() == label)
    }

    pub fn lookup_mut(&mut self, label: &str) -> Option<&mut Job> {
        for &i in &self.order {
            if let Some(job) = self.slots[i].job.as_mut() {
                if job.label.as_str() == label {
                    return Some(job);
                }
            }
        }
        None
    }

    pub fn handle_of(&self, label: &str) -> Option<JobHandle> {
        for &i in &self.order {
            if let Some(job) = self.slots[i].job.as_ref() {
                if job.label.as_str() == label {
                    return Some(JobHandle {
                        index: i,
                        generation: self.slots[i].generation,
                    });
                }
            }
        }
        None
    }

    /// Resolves a handle, returning `None` if the slot has since been
    /// removed (and possibly reused by a later insert at the same index).
    pub fn get(&self, handle: JobHandle) -> Option<&Job> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.job.as_ref()
    }

    pub fn get_mut(&mut self, handle: JobHandle) -> Option<&mut Job> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.job.as_mut()
    }

    /// Removes the record, bumping its slot's generation so any
    /// outstanding handle to it now resolves to `None`. Returns the
    /// removed job so the caller (the engine) can tear down its owned
    /// descriptors and armed timers and, if the child is still alive,
    /// install a transient reaper and signal it.
    pub fn remove(&mut self, label: &str) -> Option<Job> {
        let pos = self
            .order
            .iter()
            .position(|&i| self.slots[i].job.as_ref().map(|j| j.label.as_str()) == Some(label))?;
        let index = self.order.remove(pos);
        let slot = &mut self.slots[index];
        slot.generation += 1;
        slot.job.take()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates in insertion order. The callback may remove the current
    /// record (and any other) through `registry` methods invoked from
    /// outside this call — this only hands out shared references.
    pub fn for_each(&self, mut f: impl FnMut(&Job)) {
        for &i in &self.order {
            if let Some(job) = self.slots[i].job.as_ref() {
                f(job);
            }
        }
    }

    pub fn labels(&self) -> Vec<JobId> {
        let mut out = Vec::with_capacity(self.order.len());
        self.for_each(|job| out.push(job.label.clone()));
        out
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
