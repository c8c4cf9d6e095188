// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-adapters: OS-facing primitives with no job-lifecycle logic —
//! building sockets from a manifest socket group, watching paths and
//! queue directories for vnode-like changes, and passing file
//! descriptors across a Unix stream via `SCM_RIGHTS`. `warden-engine`
//! and `warden-daemon` drive these against the types `warden-core`
//! defines; nothing here decides what a job should do next.

pub mod fdpass;
pub mod socket;
pub mod watch;

pub use socket::{SocketError, SocketKind, SocketSpec};
pub use watch::{ArmedWatch, DirScan, VnodeEvent, WatchError};
