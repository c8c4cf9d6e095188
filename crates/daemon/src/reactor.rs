// SPDX-License-Identifier: MIT

//! The synchronous half of the event loop: one [`tick`] call drains every
//! source of a state-machine transition that spec.md §4 models as
//! originating outside the IPC verbs themselves — reaped children, armed
//! fd readiness, due timers, and watch-path/queue-directory wake-ups.
//! `main` calls this on a fixed cadence from its `tokio::select!` loop,
//! since none of these sources are backed by a `tokio::net`/`tokio::fs`
//! type the reactor can `.await` directly.

use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::UnixStream;
use tracing::{debug, info, warn};
use warden_core::constants::IDLE_EXIT_TIMEOUT;
use warden_engine::reap_available;

use crate::connection::{self, ConnectionState};
use crate::dispatch::DaemonCtx;

/// State that must persist across ticks but belongs to no single call:
/// the moment the supervisor last had zero jobs loaded.
#[derive(Default)]
pub struct ReactorState {
    idle_since: Option<Instant>,
}

/// Runs one pass over every event source. Returns `true` once the
/// idle-exit timeout (SPEC_FULL.md's on-demand-daemon exit condition) has
/// elapsed with no jobs loaded; `main` treats that the same as an
/// explicit `shutdown` once every live child has exited.
pub fn tick(ctx: &Arc<DaemonCtx>, state: &mut ReactorState) -> bool {
    drain_reaps(ctx);
    poll_armed_fds(ctx);

    {
        let mut sup = ctx.supervisor.lock();
        sup.tick_timers();
        sup.check_terminations();
        let activated = sup.poll_watch_events();
        for label in activated {
            debug!(label, "activation source fired");
        }
    }

    spawn_trust_channels(ctx);

    let is_empty = ctx.supervisor.lock().is_empty();
    if !is_empty {
        state.idle_since = None;
        return false;
    }

    let since = *state.idle_since.get_or_insert_with(Instant::now);
    if since.elapsed() >= IDLE_EXIT_TIMEOUT {
        info!("idle timeout elapsed with no jobs loaded, exiting");
        return true;
    }
    false
}

fn drain_reaps(ctx: &Arc<DaemonCtx>) {
    let reaped = reap_available();
    if reaped.is_empty() {
        return;
    }
    let mut sup = ctx.supervisor.lock();
    for child in reaped {
        let pid = child.pid;
        if let Some(outcome) = sup.handle_reap(child) {
            debug!(pid, ?outcome, "reaped child");
        }
    }
}

/// Raw socket-activation and exec-failure-pipe descriptors aren't backed
/// by any `tokio` reactor registration, so readiness is checked with a
/// direct non-blocking `poll(2)` rather than an `AsyncFd`.
fn poll_armed_fds(ctx: &Arc<DaemonCtx>) {
    let (sockets, execs) = {
        let sup = ctx.supervisor.lock();
        (sup.armed_socket_fds(), sup.armed_exec_fds())
    };
    if sockets.is_empty() && execs.is_empty() {
        return;
    }

    let mut entries: Vec<(String, RawFd, bool)> = Vec::with_capacity(sockets.len() + execs.len());
    entries.extend(sockets.into_iter().map(|(label, fd)| (label, fd, true)));
    entries.extend(execs.into_iter().map(|(label, fd)| (label, fd, false)));

    let mut pollfds: Vec<libc::pollfd> = entries
        .iter()
        .map(|(_, fd, _)| libc::pollfd {
            fd: *fd,
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();

    // SAFETY: `pollfds` is a valid buffer of the declared length for the
    // duration of this call; a zero timeout makes this a non-blocking poll.
    let ready = unsafe { libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, 0) };
    if ready <= 0 {
        return;
    }

    let mut sup = ctx.supervisor.lock();
    for (pfd, (label, _, is_socket)) in pollfds.iter().zip(entries.iter()) {
        if pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) == 0 {
            continue;
        }
        if *is_socket {
            sup.on_socket_readable(label);
        } else if let Err(e) = sup.on_exec_pipe_event(label) {
            warn!(label = %label, error = %e, "exec pipe event handling failed");
        }
    }
}

/// Adopts every child trust channel opened since the last tick as an IPC
/// connection already associated with the job that owns it (spec.md §6),
/// so `check-in` sent down it is legal from the first message.
fn spawn_trust_channels(ctx: &Arc<DaemonCtx>) {
    let pending = ctx.supervisor.lock().drain_pending_trust_channels();
    for (label, fd) in pending {
        let std_stream = std::os::unix::net::UnixStream::from(fd);
        if let Err(e) = std_stream.set_nonblocking(true) {
            warn!(label, error = %e, "failed to ready trust channel fd for the async reactor");
            continue;
        }
        match UnixStream::from_std(std_stream) {
            Ok(stream) => {
                let ctx = Arc::clone(ctx);
                tokio::spawn(connection::run(stream, ctx, ConnectionState::trusted(label)));
            }
            Err(e) => warn!(label, error = %e, "failed to adopt trust channel fd into the reactor"),
        }
    }
}

#[cfg(test)]
#[path = "reactor_tests.rs"]
mod tests;
