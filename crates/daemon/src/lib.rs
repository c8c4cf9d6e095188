// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-daemon: `wardend`, the process that owns the event loop. Holds
//! one [`warden_engine::Supervisor`] behind a lock and drives every method
//! on it from a single `tokio::select!` reactor — accepted connections,
//! reaped children, armed fd readiness, and timers all funnel through
//! [`dispatch::dispatch`] or a direct `Supervisor` call while the lock is
//! held, per spec.md §5's single-threaded-cooperative model.

pub mod connection;
pub mod dispatch;
pub mod env;
pub mod lifecycle;
pub mod logging;
pub mod protocol;
pub mod reactor;

pub use dispatch::DaemonCtx;
