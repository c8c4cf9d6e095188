// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-engine: the event-loop-facing half of the supervisor — the
//! timer scheduler, activation-source arm/disarm machinery, the child
//! launcher, the reaper, the resource-limit cache, and the `Supervisor`
//! context that ties them to `warden-core`'s job state machine. Nothing
//! here runs an async reactor; `warden-daemon` drives every method from
//! its own event loop while holding the one lock spec.md §5 calls for.

pub mod activation;
pub mod error;
pub mod launcher;
pub mod manifest;
pub mod reaper;
pub mod rlimit;
pub mod scheduler;
pub mod supervisor;

pub use activation::{ActivationError, ActivationTable};
pub use error::EngineError;
pub use launcher::{launch, ChildSetup, LaunchError, Launched};
pub use manifest::build_child_setup;
pub use reaper::{reap_available, reap_discard, ReapedChild};
pub use rlimit::{RlimitCache, RlimitKind, RlimitPair};
pub use scheduler::Scheduler;
pub use supervisor::{ReapOutcome, Supervisor};
