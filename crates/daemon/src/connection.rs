// SPDX-License-Identifier: MIT

//! Per-connection state and the read-dispatch-write loop for one accepted
//! control-socket client (spec.md §4.4's "connection record").

use std::sync::Arc;

use tokio::net::UnixStream;
use tracing::{debug, warn};

use crate::dispatch::{self, DaemonCtx};
use crate::protocol::{self, ProtocolError, Request};

/// One live IPC client. Tracks just enough state to serve
/// `check-in`/`batch-control` correctly across repeated requests sent on
/// the same connection.
#[derive(Default)]
pub struct ConnectionState {
    /// Set only for a connection opened as a child's trust channel
    /// (spec.md §6); `check-in` is legal only when this is `Some`.
    pub associated_job: Option<String>,
    pub batch_disabled: bool,
}

impl ConnectionState {
    pub fn trusted(label: String) -> Self {
        Self {
            associated_job: Some(label),
            batch_disabled: false,
        }
    }
}

/// Drives one connection until the peer disconnects or a protocol error
/// occurs, dispatching each framed request in turn. Runs as its own task;
/// releases this connection's batch-disable vote, if any, on exit.
pub async fn run(mut stream: UnixStream, ctx: Arc<DaemonCtx>, mut state: ConnectionState) {
    loop {
        let message = match protocol::read_message(&mut stream).await {
            Ok(Some(m)) => m,
            Ok(None) => break,
            Err(ProtocolError::Timeout) => {
                debug!("connection stalled mid-message, closing");
                break;
            }
            Err(e) => {
                warn!(error = %e, "connection read failed");
                break;
            }
        };

        let request = match Request::parse(message) {
            Ok(r) => r,
            Err(_) => {
                let reply = protocol::errno_reply(libc::EINVAL);
                if protocol::write_message(&mut stream, reply).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let is_query = matches!(request.verb.as_str(), "get-job" | "get-rlimits" | "get-user-env" | "batch-query");
        if is_query {
            debug!(verb = %request.verb, "received query");
        } else {
            tracing::info!(verb = %request.verb, "received request");
        }

        let reply = dispatch::dispatch(&ctx, &mut state, &request.verb, request.argument);
        if let Err(e) = protocol::write_message(&mut stream, reply).await {
            warn!(error = %e, "connection write failed");
            break;
        }
    }

    if state.batch_disabled {
        ctx.supervisor.lock().set_batch_disable(false);
    }
    if let Some(label) = state.associated_job.take() {
        debug!(label, "trust channel connection closed");
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
