// SPDX-License-Identifier: MIT

//! Timer bookkeeping for the activation sources' interval and calendar
//! timers, and for the throttle's deferred-restart timer (spec.md §4.5,
//! §4.6). One-shot only: the caller re-arms a periodic start-interval
//! timer itself once it fires.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use warden_core::TimerId;

struct Timer {
    fires_at: Instant,
}

#[derive(Default)]
pub struct Scheduler {
    timers: HashMap<String, Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `id`, replacing any previous registration at the same id —
    /// this is spec.md §4.1's "arming replaces any previous registration
    /// at the same (source, identity) pair".
    pub fn set_timer(&mut self, id: &TimerId, duration: Duration, now: Instant) {
        self.timers.insert(
            id.as_str().to_string(),
            Timer {
                fires_at: now + duration,
            },
        );
    }

    /// Arms `id` to fire at an absolute instant, for the calendar
    /// emulator's one-shot absolute timer.
    pub fn set_timer_at(&mut self, id: &TimerId, fires_at: Instant) {
        self.timers.insert(id.as_str().to_string(), Timer { fires_at });
    }

    pub fn cancel_timer(&mut self, id: &TimerId) {
        self.timers.remove(id.as_str());
    }

    pub fn cancel_timers_for_job(&mut self, label: &str) {
        self.timers
            .retain(|id, _| TimerId::new(id.clone()).job_label() != Some(label));
    }

    /// Every timer due at or before `now`, removed from the schedule.
    pub fn fired_timers(&mut self, now: Instant) -> Vec<TimerId> {
        let due: Vec<String> = self
            .timers
            .iter()
            .filter(|(_, t)| t.fires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &due {
            self.timers.remove(id);
        }
        due.into_iter().map(TimerId::new).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.fires_at).min()
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
