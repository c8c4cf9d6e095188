// SPDX-License-Identifier: MIT

//! The supervisor context: the job state machine of spec.md §4.3 plus
//! everything it needs to drive one transition per call — the registry,
//! the activation table, the timer scheduler, and the rlimit mirror.
//! `warden-daemon` holds exactly one of these behind a lock and calls a
//! method per event (IPC verb, process exit, timer fire, fd readiness);
//! nothing in here blocks or awaits.

use std::collections::{HashMap, HashSet};
use std::ffi::CString;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use nix::sys::signal::{kill, Signal};
use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use warden_core::constants::MIN_JOB_RUN_TIME;
use warden_core::job::{Job, JobState};
use warden_core::reap::{self, ReapClass};
use warden_core::value::{Mapping, Value};
use warden_core::{Clock, ErrorKind, Registry, TimerId};

use crate::activation::{parse_calendar_interval, ActivationTable};
use crate::launcher::{self, launch};
use crate::manifest::build_child_setup;
use crate::reaper::ReapedChild;
use crate::rlimit::{RlimitCache, RlimitKind, RlimitPair};
use crate::scheduler::Scheduler;

/// Grace window between SIGTERM and SIGKILL when no job-specific `timeout`
/// key is set (SPEC_FULL.md's graceful-then-forceful termination).
const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_secs(5);

/// The outcome of collecting one reaped child, for callers that want to
/// log or report it without re-deriving it from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    ShutdownInitiated,
    RemovedNoCheckin,
    RemovedFailureThreshold,
    Rearmed,
    ThrottledRestartScheduled,
    RestartedImmediately,
}

struct PendingTermination {
    deadline: Instant,
    escalated: bool,
}

/// One supervisor's full runtime state. Generic over [`Clock`] so tests can
/// drive it with [`warden_core::FakeClock`]; `warden-daemon` instantiates it
/// with `Supervisor::<SystemClock>::new`.
pub struct Supervisor<C: Clock> {
    registry: Registry,
    activation: ActivationTable,
    scheduler: Scheduler,
    rlimits: RlimitCache,
    clock: Arc<C>,

    pid_to_label: HashMap<i32, String>,
    /// Pids whose job record is already gone (removed while the child was
    /// still alive); their eventual reap is discarded, per spec.md §4.2's
    /// transient-reaper note.
    orphan_pids: HashSet<i32>,
    pending_terminations: HashMap<i32, PendingTermination>,
    /// Supervisor-retained ends of child trust channels (spec.md §6) for
    /// `service-ipc` jobs just started, not yet claimed by the caller via
    /// [`Supervisor::drain_pending_trust_channels`].
    pending_trust_channels: Vec<(String, OwnedFd)>,

    shutdown_in_progress: bool,
    batch_disable_count: u32,
    /// The supervisor's own user-environment mirror (`set/get-user-env`),
    /// merged beneath each job's `environment-variables` at launch.
    user_env: Vec<(String, String)>,
}

impl<C: Clock> Supervisor<C> {
    pub fn new(clock: Arc<C>) -> Result<Self, ErrorKind> {
        let mut rlimits = RlimitCache::new();
        rlimits.refresh_all()?;
        Ok(Self {
            registry: Registry::new(),
            activation: ActivationTable::new(),
            scheduler: Scheduler::new(),
            rlimits,
            clock,
            pid_to_label: HashMap::new(),
            orphan_pids: HashSet::new(),
            pending_terminations: HashMap::new(),
            pending_trust_channels: Vec::new(),
            shutdown_in_progress: false,
            batch_disable_count: 0,
            user_env: Vec::new(),
        })
    }

    /// `get-user-env`. A snapshot of the supervisor's own environment
    /// mirror.
    pub fn user_env(&self) -> &[(String, String)] {
        &self.user_env
    }

    /// `set-user-env`. Inserts or replaces one entry.
    pub fn set_user_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.user_env.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.user_env.push((key, value));
        }
    }

    /// `set-user-env`, unset form: removes one entry if present.
    pub fn unset_user_env(&mut self, key: &str) {
        self.user_env.retain(|(k, _)| k != key);
    }

    /// Claims every child trust channel opened since the last call, for
    /// the caller to wire into its own reactor as an IPC connection
    /// pre-associated with the job that owns it (spec.md §6).
    pub fn drain_pending_trust_channels(&mut self) -> Vec<(String, OwnedFd)> {
        std::mem::take(&mut self.pending_trust_channels)
    }

    // ---- IPC verb handlers (spec.md §4.4) ---------------------------------

    /// `submit-job`. Validates and inserts `manifest`, then starts it
    /// immediately (`run-at-load` or not on-demand) or arms its activation
    /// sources (spec.md §4.3's *Loaded* state).
    pub fn submit_job(&mut self, manifest: Value) -> Result<(), ErrorKind> {
        let mut job = Job::from_manifest(manifest)?;
        job.start_calendar_interval = parse_calendar_interval(&job.manifest);
        let label = job.label.as_str().to_string();
        let force_start = job.run_at_load || !job.on_demand;

        self.registry.insert(job)?;
        info!(label = %label, "job submitted");

        if force_start {
            self.transition_to_starting(&label)
        } else {
            self.transition_to_watching(&label)
        }
    }

    /// Loads and force-starts the job built from the supervisor's own
    /// invocation arguments (spec.md's glossary entry for "firstborn"):
    /// its clean exit during normal operation triggers supervisor
    /// shutdown (`handle_reap`'s firstborn branch).
    pub fn submit_firstborn(&mut self, manifest: Value) -> Result<(), ErrorKind> {
        let mut job = Job::from_manifest(manifest)?;
        job.firstborn = true;
        job.start_calendar_interval = parse_calendar_interval(&job.manifest);
        let label = job.label.as_str().to_string();

        self.registry.insert(job)?;
        info!(label = %label, "firstborn job submitted");
        self.transition_to_starting(&label)
    }

    /// `start-job`. Forces a transition to *Starting* regardless of current
    /// state; a no-op if the job is already running.
    pub fn start_job(&mut self, label: &str) -> Result<(), ErrorKind> {
        let job = self.registry.lookup(label).ok_or(ErrorKind::NotFound)?;
        if job.run.is_running() {
            return Ok(());
        }
        self.activation.disarm_watches(label);
        self.scheduler.cancel_timers_for_job(label);
        self.transition_to_starting(label)
    }

    /// `stop-job`. Sends a termination signal to the live child, if any.
    pub fn stop_job(&mut self, label: &str) -> Result<(), ErrorKind> {
        let job = self.registry.lookup(label).ok_or(ErrorKind::NotFound)?;
        if let Some(pid) = job.run.pid {
            self.begin_termination(label, pid);
        }
        Ok(())
    }

    /// `remove-job` (spec.md §4.2): closes owned descriptors, cancels
    /// timers, unlinks the record. If the child is alive, installs a
    /// transient reaper and sends it a termination signal.
    pub fn remove_job(&mut self, label: &str) -> Result<(), ErrorKind> {
        self.scheduler.cancel_timers_for_job(label);
        self.activation.remove(label);
        let job = self.registry.remove(label).ok_or(ErrorKind::NotFound)?;

        if let Some(pid) = job.run.pid {
            self.pid_to_label.remove(&pid);
            self.orphan_pids.insert(pid);
            self.begin_termination_for(pid, DEFAULT_TERMINATION_GRACE);
        }
        info!(label, "job removed");
        Ok(())
    }

    /// `get-job`. A redacted deep copy of one manifest, or of every job's
    /// manifest keyed by label when `label` is `None`.
    pub fn get_job(&self, label: Option<&str>) -> Result<Value, ErrorKind> {
        match label {
            Some(label) => {
                let job = self.registry.lookup(label).ok_or(ErrorKind::NotFound)?;
                Ok(job.manifest.redact_fds())
            }
            None => {
                let mut out = Mapping::new();
                self.registry.for_each(|job| {
                    out.insert(job.label.as_str().to_string(), job.manifest.redact_fds());
                });
                Ok(Value::Map(out))
            }
        }
    }

    /// `check-in`. Only meaningful on a connection already associated with
    /// the job via the trusted-fd hand-off; `warden-daemon` enforces that
    /// association and only calls this once it's confirmed.
    pub fn check_in(&mut self, label: &str) -> Result<Value, ErrorKind> {
        let job = self.registry.lookup_mut(label).ok_or(ErrorKind::NotFound)?;
        job.run.checked_in = true;
        Ok(job.manifest.redact_fds())
    }

    /// `workaround-bonjour`. Attaches `fds` under `key` in the named job's
    /// manifest, in place. Fails with [`ErrorKind::Transient`] if the
    /// manifest is shared elsewhere and can't be mutated in place, which
    /// does not happen in ordinary operation (nothing else clones the
    /// `Arc`).
    pub fn attach_fds(&mut self, label: &str, key: &str, fds: Vec<std::os::fd::OwnedFd>) -> Result<(), ErrorKind> {
        let job = self.registry.lookup_mut(label).ok_or(ErrorKind::NotFound)?;
        let manifest = Arc::get_mut(&mut job.manifest)
            .ok_or_else(|| ErrorKind::transient(libc::EBUSY))?;
        let map = manifest
            .as_map_mut()
            .ok_or_else(|| ErrorKind::invalid("manifest is not a mapping"))?;
        map.insert(key.to_string(), Value::Array(fds.into_iter().map(Value::Fd).collect()));
        Ok(())
    }

    pub fn get_rlimits(&self) -> &std::collections::BTreeMap<RlimitKind, RlimitPair> {
        self.rlimits.get()
    }

    pub fn set_rlimit(&mut self, kind: RlimitKind, pair: RlimitPair) -> Result<RlimitPair, ErrorKind> {
        self.rlimits.set(kind, pair)
    }

    /// `batch-control`. `enable` toggles this connection's batch-disable
    /// flag; the caller (which owns per-connection state) is responsible
    /// for calling this exactly once per actual flag flip.
    pub fn set_batch_disable(&mut self, enable: bool) {
        if enable {
            self.batch_disable_count += 1;
        } else {
            self.batch_disable_count = self.batch_disable_count.saturating_sub(1);
        }
    }

    pub fn batch_disabled(&self) -> bool {
        self.batch_disable_count > 0
    }

    /// `shutdown` (spec.md §4.8): marks shutdown in progress and sends every
    /// live child a termination signal. The caller keeps driving process-exit
    /// events until [`Supervisor::live_child_count`] reaches zero.
    pub fn begin_shutdown(&mut self) {
        if self.shutdown_in_progress {
            return;
        }
        self.shutdown_in_progress = true;
        info!("shutdown requested");
        let labels = self.registry.labels();
        for label in labels {
            if let Some(pid) = self.registry.lookup(label.as_str()).and_then(|j| j.run.pid) {
                self.begin_termination(label.as_str(), pid);
            }
        }
    }

    pub fn shutdown_in_progress(&self) -> bool {
        self.shutdown_in_progress
    }

    pub fn live_child_count(&self) -> usize {
        self.pid_to_label.len() + self.orphan_pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    // ---- Event-driven transitions -------------------------------------

    /// A job's socket-activation descriptor became readable.
    pub fn on_socket_readable(&mut self, label: &str) {
        if self.is_watching(label) {
            let _ = self.transition_to_starting(label);
        }
    }

    /// Non-blocking drain of every watch-path/queue-directory event queued
    /// for jobs currently in *Watching*. Returns the labels that activated.
    pub fn poll_watch_events(&mut self) -> Vec<String> {
        let labels: Vec<String> = self.activation.labels().map(str::to_string).collect();
        let mut activated = Vec::new();

        for label in labels {
            if !self.is_watching(&label) {
                continue;
            }

            let mut fire = !self.activation.poll_watch_paths(&label).is_empty();

            for (idx, _events) in self.activation.poll_queue_dirs(&label) {
                let Some(job) = self.registry.lookup(&label) else { break };
                let Some(slot) = job.queue_directories.get(idx) else { continue };
                let path = warden_adapters::watch::canonical_or_self(&slot.path);
                match warden_adapters::watch::scan_queue_directory(&path) {
                    Ok(scan) if scan.non_empty => fire = true,
                    Ok(_) => debug!(label = %label, "queue directory event was a spurious wake"),
                    Err(e) => warn!(label = %label, error = %e, "queue directory scan failed"),
                }
            }

            if fire && self.transition_to_starting(&label).is_ok() {
                activated.push(label);
            }
        }
        activated
    }

    /// The exec-failure pipe for `label`'s running child became readable
    /// (or hit EOF). Per spec.md §4.3's *Running* state: EOF means the
    /// child exec'd successfully; a reported errno means it failed and the
    /// job is removed.
    pub fn on_exec_pipe_event(&mut self, label: &str) -> Result<(), ErrorKind> {
        let Some(job) = self.registry.lookup_mut(label) else {
            return Ok(());
        };
        let Some(fd) = job.run.exec_fd.take() else {
            return Ok(());
        };

        match launcher::read_exec_result(&fd) {
            Ok(None) => Ok(()),
            Ok(Some(errno)) => {
                warn!(label, errno, "child failed to exec");
                self.remove_job(label)
            }
            Err(_) => {
                if let Some(job) = self.registry.lookup_mut(label) {
                    job.run.exec_fd = Some(fd);
                }
                Ok(())
            }
        }
    }

    /// Feeds one reaped child into the state machine. Returns `None` when
    /// the pid belongs to no live record (a transient reap of an already
    /// removed job).
    pub fn handle_reap(&mut self, reaped: ReapedChild) -> Option<ReapOutcome> {
        self.pending_terminations.remove(&reaped.pid);

        if self.orphan_pids.remove(&reaped.pid) {
            debug!(pid = reaped.pid, "discarded transient reap of a removed job");
            return None;
        }

        let label = self.pid_to_label.remove(&reaped.pid)?;
        let (time_alive, firstborn, service_ipc, checked_in, on_demand) = {
            let job = self.registry.lookup_mut(&label)?;
            let time_alive = job
                .run
                .start_time
                .map(|start| self.clock.now().saturating_duration_since(start))
                .unwrap_or_default();
            job.run.pid = None;
            job.run.exec_fd = None;
            job.run.start_time = None;
            (time_alive, job.firstborn, job.service_ipc, job.run.checked_in, job.on_demand)
        };

        let class = reap::classify(reaped.disposition);
        debug!(label = %label, ?class, time_alive_secs = time_alive.as_secs(), "child reaped");

        if firstborn && class == ReapClass::Neutral {
            self.begin_shutdown();
            return Some(ReapOutcome::ShutdownInitiated);
        }

        if service_ipc && !checked_in {
            warn!(label = %label, "service-ipc job exited without checking in");
            let _ = self.remove_job(&label);
            return Some(ReapOutcome::RemovedNoCheckin);
        }

        if !on_demand {
            if let Some(job) = self.registry.lookup_mut(&label) {
                let outcome = reap::apply_timing_policy(time_alive, class, job.failed_exits);
                job.failed_exits = outcome.failed_exits;
                job.throttle = outcome.throttle;
            }
        }

        let Some(job) = self.registry.lookup(&label) else {
            return None;
        };

        if reap::exceeds_failure_threshold(job.failed_exits) {
            warn!(label = %label, failed_exits = job.failed_exits, "job exceeded failure threshold");
            let _ = self.remove_job(&label);
            return Some(ReapOutcome::RemovedFailureThreshold);
        }

        if job.on_demand || self.shutdown_in_progress {
            let _ = self.transition_to_watching(&label);
            return Some(ReapOutcome::Rearmed);
        }

        if job.throttle {
            self.scheduler
                .set_timer(&TimerId::throttle_restart(&job.label), MIN_JOB_RUN_TIME, self.clock.now());
            if let Some(job) = self.registry.lookup_mut(&label) {
                job.state = JobState::Watching;
            }
            return Some(ReapOutcome::ThrottledRestartScheduled);
        }

        let _ = self.transition_to_starting(&label);
        Some(ReapOutcome::RestartedImmediately)
    }

    /// Drains every due timer: throttle-restart, start-interval, and
    /// calendar timers all resolve to the same action, a forced
    /// transition to *Starting*.
    pub fn tick_timers(&mut self) {
        let now = self.clock.now();
        for id in self.scheduler.fired_timers(now) {
            let Some(label) = id.job_label().map(str::to_string) else { continue };

            if id.is_throttle_restart() {
                if let Some(job) = self.registry.lookup_mut(&label) {
                    job.throttle = false;
                }
            }

            if !self.registry.lookup(&label).map(|j| j.run.is_running()).unwrap_or(false) {
                let _ = self.transition_to_starting(&label);
            }
        }
    }

    /// Escalates any termination past its grace window from SIGTERM to
    /// SIGKILL.
    pub fn check_terminations(&mut self) {
        let now = self.clock.now();
        for (&pid, pending) in self.pending_terminations.iter_mut() {
            if !pending.escalated && now >= pending.deadline {
                warn!(pid, "termination grace window elapsed, sending SIGKILL");
                let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
                pending.escalated = true;
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Raw socket descriptors currently armed for fd-readable events,
    /// paired with the owning job's label, for the caller to register with
    /// its own reactor.
    pub fn armed_socket_fds(&self) -> Vec<(String, RawFd)> {
        self.activation
            .labels()
            .flat_map(|label| {
                self.activation
                    .socket_fds(label)
                    .into_iter()
                    .map(move |fd| (label.to_string(), fd))
            })
            .collect()
    }

    pub fn label_for_socket_fd(&self, fd: RawFd) -> Option<&str> {
        self.activation.label_for_socket_fd(fd)
    }

    /// Raw exec-failure-pipe read ends currently open for a *Running* job,
    /// paired with the owning label, for the caller to poll for
    /// readability and feed back through [`Supervisor::on_exec_pipe_event`].
    pub fn armed_exec_fds(&self) -> Vec<(String, RawFd)> {
        let mut out = Vec::new();
        self.registry.for_each(|job| {
            if let Some(fd) = &job.run.exec_fd {
                out.push((job.label.as_str().to_string(), fd.as_raw_fd()));
            }
        });
        out
    }

    // ---- Internal transition helpers -----------------------------------

    fn is_watching(&self, label: &str) -> bool {
        self.registry.lookup(label).map(|j| j.state == JobState::Watching).unwrap_or(false)
    }

    /// *Loaded*/*Reaping* → *Watching*: arms every declared activation
    /// source, per spec.md §3's invariant that an on-demand, non-throttled,
    /// non-running job always has its sources armed. A job with no
    /// activation sources simply parks here with nothing armed (it can
    /// only leave via `start-job` or a timer).
    fn transition_to_watching(&mut self, label: &str) -> Result<(), ErrorKind> {
        let wants_armed = self
            .registry
            .lookup(label)
            .map(|job| job.wants_activation_armed(self.shutdown_in_progress))
            .ok_or(ErrorKind::NotFound)?;

        if let Some(job) = self.registry.lookup_mut(label) {
            job.state = JobState::Watching;
        }
        debug!(label, "transitioned to watching");

        if !wants_armed {
            return Ok(());
        }

        let job = self.registry.lookup(label).ok_or(ErrorKind::NotFound)?;
        self.activation
            .ensure_sockets(job)
            .map_err(|e| ErrorKind::transient(libc::EIO).tap_warn(label, &e))?;
        let queue_dir_active = self
            .activation
            .arm_watches(job)
            .map_err(|e| ErrorKind::transient(libc::EIO).tap_warn(label, &e))?;

        self.arm_timers(label)?;

        if queue_dir_active {
            return self.transition_to_starting(label);
        }
        Ok(())
    }

    fn arm_timers(&mut self, label: &str) -> Result<(), ErrorKind> {
        let job = self.registry.lookup(label).ok_or(ErrorKind::NotFound)?;
        let now = self.clock.now();

        if let Some(interval) = job.start_interval {
            self.scheduler.set_timer(&TimerId::start_interval(&job.label), interval, now);
        }

        if let Some(spec) = job.start_calendar_interval {
            let reference: DateTime<Local> = self.clock.wall_now().into();
            let fire_at = warden_core::calendar::next_fire(&spec, reference);
            let delta = fire_at
                .signed_duration_since(reference)
                .to_std()
                .unwrap_or(Duration::from_secs(60));
            self.scheduler.set_timer_at(&TimerId::calendar(&job.label), now + delta);
        }

        Ok(())
    }

    /// *Watching*/*Loaded*/*Reaping* → *Starting* → *Running*: disarms
    /// watch sources (sockets persist), forks, and records the child.
    fn transition_to_starting(&mut self, label: &str) -> Result<(), ErrorKind> {
        self.activation.disarm_watches(label);
        self.scheduler.cancel_timers_for_job(label);

        if let Some(job) = self.registry.lookup_mut(label) {
            job.state = JobState::Starting;
        }

        let mut inherited_fds = self.activation.socket_fds(label);
        let job = self.registry.lookup(label).ok_or(ErrorKind::NotFound)?;
        let service_ipc = job.service_ipc;

        let trust_pair = if service_ipc {
            match open_trust_channel() {
                Ok(pair) => Some(pair),
                Err(e) => {
                    warn!(label, error = %e, "failed to open child trust channel");
                    None
                }
            }
        } else {
            None
        };
        if let Some((_, child_end)) = &trust_pair {
            inherited_fds.push(child_end.as_raw_fd());
        }

        let job = self.registry.lookup(label).ok_or(ErrorKind::NotFound)?;
        let mut setup = build_child_setup(job, inherited_fds, &self.user_env)?;
        if let Some((_, child_end)) = &trust_pair {
            if let Ok(env) = CString::new(format!("WARDEND_TRUST_FD={}", child_end.as_raw_fd())) {
                setup.envp.push(env);
            }
        }

        match launch(setup) {
            Ok(launched) => {
                let pid = launched.pid.as_raw();
                if let Some(job) = self.registry.lookup_mut(label) {
                    job.run.pid = Some(pid);
                    job.run.exec_fd = Some(launched.exec_fd);
                    job.run.start_time = Some(self.clock.now());
                    job.run.checked_in = false;
                    job.state = JobState::Running;
                }
                self.pid_to_label.insert(pid, label.to_string());
                if let Some((parent_end, _)) = trust_pair {
                    self.pending_trust_channels.push((label.to_string(), parent_end));
                }
                info!(label, pid, "child started");
                Ok(())
            }
            Err(e) => {
                warn!(label, error = %e, "fork failed, returning to watching");
                self.transition_to_watching(label)
            }
        }
    }

    fn begin_termination(&mut self, label: &str, pid: i32) {
        let grace = self
            .registry
            .lookup(label)
            .and_then(|job| job.manifest.as_map())
            .and_then(|m| m.get("timeout"))
            .and_then(Value::as_int)
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(secs as u64))
            .unwrap_or(DEFAULT_TERMINATION_GRACE);
        self.begin_termination_for(pid, grace);
    }

    fn begin_termination_for(&mut self, pid: i32, grace: Duration) {
        debug!(pid, "sending SIGTERM");
        let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
        self.pending_terminations.insert(
            pid,
            PendingTermination {
                deadline: self.clock.now() + grace,
                escalated: false,
            },
        );
    }
}

/// Opens the socket pair backing a `service-ipc` job's check-in channel
/// (spec.md §6): `.0` is kept by the supervisor and converted into an IPC
/// connection once the child is launched; `.1` is inherited by the child
/// and its number is published via `WARDEND_TRUST_FD`.
fn open_trust_channel() -> nix::Result<(OwnedFd, OwnedFd)> {
    socketpair(AddressFamily::Unix, SockType::Stream, None, SockFlag::SOCK_CLOEXEC)
}

/// Tiny helper so a mapped error can still carry a log line at the call
/// site without breaking the `?`-chain's expression shape.
trait TapWarn {
    fn tap_warn(self, label: &str, err: &dyn std::fmt::Display) -> Self;
}

impl TapWarn for ErrorKind {
    fn tap_warn(self, label: &str, err: &dyn std::fmt::Display) -> Self {
        warn!(label, %err, "activation arm failed");
        self
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
