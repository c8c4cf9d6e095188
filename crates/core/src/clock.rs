// SPDX-License-Identifier: MIT

//! Time source abstraction, so the reaper's throttle math and the calendar
//! emulator can be driven from a fake clock in tests instead of wall time.

use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

/// A source of both monotonic and wall-clock time.
///
/// `now()` backs runtime-duration math (throttle, reward time); `wall_now()`
/// backs anything that must be expressed as calendar time, namely the
/// calendar emulator.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn wall_now(&self) -> SystemTime;
}

/// The real clock. Stateless; every call reads the OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock tests can advance deterministically.
pub struct FakeClock {
    state: Mutex<FakeClockState>,
}

struct FakeClockState {
    monotonic: Instant,
    wall: SystemTime,
}

impl FakeClock {
    pub fn new(wall: SystemTime) -> Self {
        Self {
            state: Mutex::new(FakeClockState {
                monotonic: Instant::now(),
                wall,
            }),
        }
    }

    pub fn advance(&self, dur: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.monotonic += dur;
        state.wall += dur;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).monotonic
    }

    fn wall_now(&self) -> SystemTime {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).wall
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
