// SPDX-License-Identifier: MIT

//! Verb dispatch table (spec.md §4.4): one branch per verb, each driven
//! synchronously against the held [`Supervisor`] lock. `submit-job` is the
//! only verb whose argument shape branches on a single-vs-array mapping;
//! every other verb's argument/reply shape follows the table verbatim.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};
use parking_lot::Mutex;
use tracing::warn;
use warden_core::value::{Mapping, Value};
use warden_core::{ErrorKind, SystemClock};
use warden_engine::{RlimitKind, RlimitPair, Supervisor};

use crate::connection::ConnectionState;
use crate::logging::{self, LogReloadHandle};
use crate::protocol::{errno_reply, mapping_of};

/// The reserved manifest key `workaround-bonjour` attaches its fds under,
/// per spec.md §4.4's reply-shape note for that verb.
const BONJOUR_FD_KEY: &str = "WardendBonjourFds";

/// Everything one dispatch call needs beyond the per-connection state:
/// the supervisor lock, the live log-filter handle, and the mirrors for
/// shared process-wide knobs the core has no other home for (umask,
/// log mask) since only the kernel, not the supervisor, holds their
/// ground truth.
pub struct DaemonCtx {
    pub supervisor: Mutex<Supervisor<SystemClock>>,
    pub log_handle: LogReloadHandle,
    pub umask: AtomicU32,
    pub log_mask: AtomicI32,
}

impl DaemonCtx {
    pub fn new(supervisor: Supervisor<SystemClock>, log_handle: LogReloadHandle, initial_umask: u32) -> Self {
        Self {
            supervisor: Mutex::new(supervisor),
            log_handle,
            umask: AtomicU32::new(initial_umask),
            log_mask: AtomicI32::new(2),
        }
    }
}

/// Dispatches one decoded verb, returning the reply value to write back.
pub fn dispatch(ctx: &DaemonCtx, conn: &mut ConnectionState, verb: &str, argument: Value) -> Value {
    match verb {
        "submit-job" => submit_job(ctx, argument),
        "start-job" => with_label(&argument, |label| ctx.supervisor.lock().start_job(label)),
        "stop-job" => with_label(&argument, |label| ctx.supervisor.lock().stop_job(label)),
        "remove-job" => with_label(&argument, |label| ctx.supervisor.lock().remove_job(label)),
        "get-job" => get_job(ctx, argument),
        "check-in" => check_in(ctx, conn),
        "set-user-env" => set_user_env(ctx, argument),
        "get-user-env" => get_user_env(ctx),
        "set-rlimits" => set_rlimits(ctx, argument),
        "get-rlimits" => get_rlimits(ctx),
        "set-log-mask" => set_log_mask(ctx, argument),
        "get-log-mask" => Value::Int(ctx.log_mask.load(Ordering::SeqCst) as i64),
        "set-umask" => set_umask(ctx, argument),
        "get-umask" => Value::Int(ctx.umask.load(Ordering::SeqCst) as i64),
        "get-rusage" => get_rusage(argument),
        "set-stdout" => set_stdio(argument, libc::STDOUT_FILENO),
        "set-stderr" => set_stdio(argument, libc::STDERR_FILENO),
        "batch-control" => batch_control(ctx, conn, argument),
        "batch-query" => Value::Bool(conn.batch_disabled),
        "shutdown" => {
            ctx.supervisor.lock().begin_shutdown();
            errno_reply(0)
        }
        "reload-ttys" => errno_reply(0),
        "workaround-bonjour" => workaround_bonjour(ctx, argument),
        _ => errno_reply(ErrorKind::NotImplemented.code()),
    }
}

fn reply_of(result: Result<(), ErrorKind>) -> Value {
    errno_reply(result.err().unwrap_or(ErrorKind::None).code())
}

fn as_label(argument: &Value) -> Result<&str, ErrorKind> {
    argument.as_str().ok_or_else(|| ErrorKind::invalid("expected a label string"))
}

fn with_label(argument: &Value, f: impl FnOnce(&str) -> Result<(), ErrorKind>) -> Value {
    match as_label(argument) {
        Ok(label) => reply_of(f(label)),
        Err(e) => errno_reply(e.code()),
    }
}

fn submit_job(ctx: &DaemonCtx, argument: Value) -> Value {
    match argument {
        Value::Array(manifests) => {
            let mut sup = ctx.supervisor.lock();
            let replies = manifests
                .into_iter()
                .map(|m| errno_reply(sup.submit_job(m).err().unwrap_or(ErrorKind::None).code()))
                .collect();
            Value::Array(replies)
        }
        manifest @ Value::Map(_) => reply_of(ctx.supervisor.lock().submit_job(manifest)),
        _ => errno_reply(ErrorKind::invalid("expected a mapping or array of mappings").code()),
    }
}

fn get_job(ctx: &DaemonCtx, argument: Value) -> Value {
    let label = argument.as_str();
    match ctx.supervisor.lock().get_job(label) {
        Ok(value) => value,
        Err(e) => errno_reply(e.code()),
    }
}

fn check_in(ctx: &DaemonCtx, conn: &mut ConnectionState) -> Value {
    let Some(label) = conn.associated_job.as_deref() else {
        return errno_reply(ErrorKind::PermissionDenied.code());
    };
    match ctx.supervisor.lock().check_in(label) {
        Ok(manifest) => manifest,
        Err(e) => errno_reply(e.code()),
    }
}

fn set_user_env(ctx: &DaemonCtx, argument: Value) -> Value {
    match argument {
        Value::Map(map) => {
            let mut sup = ctx.supervisor.lock();
            for (key, value) in map.iter() {
                let Some(value) = value.as_str() else {
                    return errno_reply(ErrorKind::invalid("environment values must be strings").code());
                };
                sup.set_user_env(key.to_string(), value.to_string());
            }
            errno_reply(0)
        }
        Value::Str(key) => {
            ctx.supervisor.lock().unset_user_env(&key);
            errno_reply(0)
        }
        _ => errno_reply(ErrorKind::invalid("expected a mapping or a key string").code()),
    }
}

fn get_user_env(ctx: &DaemonCtx) -> Value {
    let sup = ctx.supervisor.lock();
    let mut map = Mapping::new();
    for (k, v) in sup.user_env() {
        map.insert(k.clone(), Value::str(v.clone()));
    }
    Value::Map(map)
}

fn rlimit_kind_of(value: &Value) -> Option<RlimitKind> {
    value.as_str().and_then(RlimitKind::from_manifest_key)
}

fn set_rlimits(ctx: &DaemonCtx, argument: Value) -> Value {
    let Some(items) = argument.as_array() else {
        return errno_reply(ErrorKind::invalid("expected an array of rlimit entries").code());
    };

    let mut sup = ctx.supervisor.lock();
    for item in items {
        let Some(map) = item.as_map() else { continue };
        let Some(kind) = map.get("kind").and_then(rlimit_kind_of) else { continue };
        let soft = map.get("soft").and_then(Value::as_int).unwrap_or(0) as u64;
        let hard = map.get("hard").and_then(Value::as_int).unwrap_or(soft as i64) as u64;
        if let Err(e) = sup.set_rlimit(kind, RlimitPair { soft, hard }) {
            warn!(?kind, error = %e, "set-rlimits failed for one entry");
        }
    }
    rlimits_to_value(sup.get_rlimits())
}

fn get_rlimits(ctx: &DaemonCtx) -> Value {
    rlimits_to_value(ctx.supervisor.lock().get_rlimits())
}

fn rlimits_to_value(rlimits: &std::collections::BTreeMap<RlimitKind, RlimitPair>) -> Value {
    Value::Array(
        rlimits
            .iter()
            .map(|(kind, pair)| {
                mapping_of(vec![
                    ("kind", Value::str(kind.as_manifest_key())),
                    ("soft", Value::Int(pair.soft as i64)),
                    ("hard", Value::Int(pair.hard as i64)),
                ])
            })
            .collect(),
    )
}

fn set_log_mask(ctx: &DaemonCtx, argument: Value) -> Value {
    let Some(mask) = argument.as_int() else {
        return errno_reply(ErrorKind::invalid("expected an integer log mask").code());
    };
    match logging::apply_log_mask(&ctx.log_handle, mask as i32) {
        Ok(()) => {
            ctx.log_mask.store(mask as i32, Ordering::SeqCst);
            Value::Int(mask)
        }
        Err(e) => {
            warn!(error = %e, "failed to reload log filter");
            errno_reply(ErrorKind::transient(libc::EIO).code())
        }
    }
}

fn set_umask(ctx: &DaemonCtx, argument: Value) -> Value {
    let Some(mask) = argument.as_int() else {
        return errno_reply(ErrorKind::invalid("expected an integer umask").code());
    };
    let previous = nix::sys::stat::umask(Mode::from_bits_truncate(mask as u32));
    ctx.umask.store(mask as u32, Ordering::SeqCst);
    Value::Int(previous.bits() as i64)
}

fn get_rusage(argument: Value) -> Value {
    let who = match argument.as_str() {
        Some("children") => libc::RUSAGE_CHILDREN,
        _ => libc::RUSAGE_SELF,
    };

    // SAFETY: `usage` is a plain-old-data struct fully initialized by the
    // kernel before `getrusage` returns 0.
    let usage = unsafe {
        let mut usage: libc::rusage = std::mem::zeroed();
        if libc::getrusage(who, &mut usage) != 0 {
            return errno_reply(ErrorKind::transient(std::io::Error::last_os_error().raw_os_error().unwrap_or(libc::EIO)).code());
        }
        usage
    };

    mapping_of(vec![
        ("utime-sec", Value::Int(usage.ru_utime.tv_sec as i64)),
        ("utime-usec", Value::Int(usage.ru_utime.tv_usec as i64)),
        ("stime-sec", Value::Int(usage.ru_stime.tv_sec as i64)),
        ("stime-usec", Value::Int(usage.ru_stime.tv_usec as i64)),
        ("max-rss", Value::Int(usage.ru_maxrss as i64)),
        ("minor-faults", Value::Int(usage.ru_minflt as i64)),
        ("major-faults", Value::Int(usage.ru_majflt as i64)),
        ("block-input-ops", Value::Int(usage.ru_inblock as i64)),
        ("block-output-ops", Value::Int(usage.ru_oublock as i64)),
        ("voluntary-switches", Value::Int(usage.ru_nvcsw as i64)),
        ("involuntary-switches", Value::Int(usage.ru_nivcsw as i64)),
    ])
}

/// `set-stdout`/`set-stderr`: a path is opened and `dup2`'d immediately
/// rather than deferred to the next filesystem-mount event — this
/// supervisor models no mount-event source, so the deferral spec.md
/// describes has no trigger to wait for here (see DESIGN.md).
fn set_stdio(argument: Value, target: RawFd) -> Value {
    let result = match argument {
        Value::Str(path) => redirect_stdio_path(&path, target),
        Value::Fd(fd) => redirect_stdio_fd(fd, target),
        _ => Err(ErrorKind::invalid("expected a path string or a file descriptor")),
    };
    reply_of(result)
}

fn redirect_stdio_path(path: &str, target: RawFd) -> Result<(), ErrorKind> {
    let cpath = std::ffi::CString::new(path).map_err(|_| ErrorKind::invalid("path contains a NUL byte"))?;
    let fd = open(cpath.as_c_str(), OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND, Mode::from_bits_truncate(0o644))
        .map_err(|e| ErrorKind::transient(e as i32))?;
    let result = dup2(fd, target).map_err(|e| ErrorKind::transient(e as i32));
    let _ = close(fd);
    result.map(|_| ())
}

fn redirect_stdio_fd(fd: OwnedFd, target: RawFd) -> Result<(), ErrorKind> {
    let raw = fd.as_raw_fd();
    dup2(raw, target).map_err(|e| ErrorKind::transient(e as i32))?;
    Ok(())
}

fn batch_control(ctx: &DaemonCtx, conn: &mut ConnectionState, argument: Value) -> Value {
    let Some(enable) = argument.as_bool() else {
        return errno_reply(ErrorKind::invalid("expected a boolean").code());
    };
    if enable != conn.batch_disabled {
        ctx.supervisor.lock().set_batch_disable(enable);
        conn.batch_disabled = enable;
    }
    errno_reply(0)
}

fn workaround_bonjour(ctx: &DaemonCtx, argument: Value) -> Value {
    let Value::Map(mut map) = argument else {
        return errno_reply(ErrorKind::invalid("expected a mapping of label to fd array").code());
    };
    let labels: Vec<String> = map.iter().map(|(k, _)| k.to_string()).collect();

    let mut sup = ctx.supervisor.lock();
    let mut code = 0;
    for label in labels {
        let Some(Value::Array(items)) = map.remove(&label) else { continue };
        let fds: Vec<OwnedFd> = items.into_iter().filter_map(Value::into_fd).collect();
        if let Err(e) = sup.attach_fds(&label, BONJOUR_FD_KEY, fds) {
            code = e.code();
        }
    }
    errno_reply(code)
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
