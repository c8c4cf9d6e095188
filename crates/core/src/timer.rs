// SPDX-License-Identifier: MIT

//! Timer identifiers for the three kinds of timer the engine schedules
//! against a job: the periodic start-interval, the one-shot calendar
//! fire, and the one-shot deferred-restart timer armed while a job is
//! throttled (spec.md §4.5, §4.6).

use crate::job::JobId;

crate::define_id! {
    /// Unique identifier for a scheduled timer.
    pub struct TimerId;
}

impl TimerId {
    pub fn start_interval(job_id: &JobId) -> Self {
        Self::new(format!("start-interval:{job_id}"))
    }

    pub fn calendar(job_id: &JobId) -> Self {
        Self::new(format!("calendar:{job_id}"))
    }

    pub fn throttle_restart(job_id: &JobId) -> Self {
        Self::new(format!("throttle-restart:{job_id}"))
    }

    pub fn is_start_interval(&self) -> bool {
        self.0.starts_with("start-interval:")
    }

    pub fn is_calendar(&self) -> bool {
        self.0.starts_with("calendar:")
    }

    pub fn is_throttle_restart(&self) -> bool {
        self.0.starts_with("throttle-restart:")
    }

    /// Extracts the job label this timer is scheduled against, regardless
    /// of kind.
    pub fn job_label(&self) -> Option<&str> {
        self.0
            .strip_prefix("start-interval:")
            .or_else(|| self.0.strip_prefix("calendar:"))
            .or_else(|| self.0.strip_prefix("throttle-restart:"))
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
