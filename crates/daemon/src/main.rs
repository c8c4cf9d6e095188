// SPDX-License-Identifier: MIT

//! `wardend`: the process that owns the event loop. Loads its own
//! invocation arguments as an optional firstborn job, binds the control
//! socket, then drives everything else — accepted connections, reaped
//! children, armed fd readiness, timers — from one `tokio::select!` loop.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;
use std::time::Duration;

use nix::sys::stat::{umask, Mode};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use warden_core::value::{Mapping, Value};
use warden_core::SystemClock;
use warden_engine::Supervisor;
use warden_daemon::connection::{self, ConnectionState};
use warden_daemon::dispatch::DaemonCtx;
use warden_daemon::lifecycle::{self, Config, LifecycleError, StartupResult};
use warden_daemon::reactor::{self, ReactorState};
use warden_daemon::{env, logging};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(flag) = args.first() {
        match flag.as_str() {
            "--version" | "-V" | "-v" => {
                println!("wardend {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {}
        }
    }

    let config = Config::load()?;

    logging::rotate_log_if_needed(&config.log_path);
    logging::write_startup_marker(&config.log_path);

    let (log_guard, log_handle) = logging::setup_logging(&config.log_path)?;
    info!("starting wardend");

    let StartupResult { listener, lock_file } = match lifecycle::startup(&config) {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path).unwrap_or_default();
            let version = std::fs::read_to_string(&config.version_path).unwrap_or_default();
            eprintln!("wardend is already running");
            let pid = pid.trim();
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            let version = version.trim();
            if !version.is_empty() {
                eprintln!("  {version}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            logging::write_startup_error(&config.log_path, &e);
            error!(error = %e, "failed to start wardend");
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Read the process umask without altering it: `umask(2)` only ever
    // sets-and-returns, so the previous value has to be set right back.
    let initial_umask = {
        let previous = umask(Mode::empty());
        umask(previous);
        previous.bits() as u32
    };

    let mut supervisor = Supervisor::<SystemClock>::new(Arc::new(SystemClock))?;
    if let Some(program) = args.first() {
        if let Err(e) = supervisor.submit_firstborn(firstborn_manifest(program, &args)) {
            error!(error = %e, "failed to submit firstborn job");
        }
    }

    let ctx = Arc::new(DaemonCtx::new(supervisor, log_handle, initial_umask));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigchld = signal(SignalKind::child())?;
    let mut timer_check = tokio::time::interval(timer_check_interval());
    let mut reactor_state = ReactorState::default();

    info!(socket = %config.socket_path.display(), "wardend ready");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let ctx = Arc::clone(&ctx);
                        tokio::spawn(connection::run(stream, ctx, ConnectionState::default()));
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                ctx.supervisor.lock().begin_shutdown();
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                ctx.supervisor.lock().begin_shutdown();
            }
            _ = sigchld.recv() => {
                reactor::tick(&ctx, &mut reactor_state);
            }
            _ = timer_check.tick() => {
                if reactor::tick(&ctx, &mut reactor_state) {
                    ctx.supervisor.lock().begin_shutdown();
                }
            }
        }

        let sup = ctx.supervisor.lock();
        if sup.shutdown_in_progress() && sup.live_child_count() == 0 {
            break;
        }
    }

    drop(lock_file);
    lifecycle::shutdown(&config);
    info!("wardend stopped");
    Ok(())
}

/// Timer-check cadence, configurable via `WARDEND_TIMER_CHECK_MS`. Faster
/// than the teacher's own 1-second default since this loop also polls
/// armed socket and exec-pipe descriptors, not just timers.
fn timer_check_interval() -> Duration {
    env::timer_check_ms()
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(250))
}

fn firstborn_manifest(program: &str, args: &[String]) -> Value {
    let mut map = Mapping::new();
    map.insert("label", Value::str("wardend.firstborn"));
    map.insert("program", Value::str(program));
    map.insert(
        "program-arguments",
        Value::Array(args.iter().map(|a| Value::str(a.clone())).collect()),
    );
    map.insert("run-at-load", Value::Bool(true));
    Value::Map(map)
}

fn print_help() {
    println!("wardend {}", env!("CARGO_PKG_VERSION"));
    println!("Per-host service supervisor daemon");
    println!();
    println!("USAGE:");
    println!("    wardend [program] [args...]");
    println!();
    println!("With no arguments, wardend starts empty and waits for jobs to be");
    println!("submitted over its control socket. With a program and arguments,");
    println!("that program is loaded as the firstborn job: its clean exit during");
    println!("normal operation shuts the supervisor down.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}
