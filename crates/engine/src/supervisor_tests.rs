use std::sync::Arc;
use std::time::SystemTime;

use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use warden_core::reap::Disposition;
use warden_core::value::{Mapping, Value};
use warden_core::{ErrorKind, FakeClock};

use crate::reaper::ReapedChild;

use super::*;

fn manifest(label: &str, program: &str, pairs: Vec<(&str, Value)>) -> Value {
    let mut map = Mapping::new();
    map.insert("label", Value::str(label));
    map.insert("program", Value::str(program));
    map.insert("program-arguments", Value::Array(vec![Value::str(program)]));
    for (k, v) in pairs {
        map.insert(k, v);
    }
    Value::Map(map)
}

fn supervisor() -> Supervisor<FakeClock> {
    let clock = Arc::new(FakeClock::new(SystemTime::now()));
    Supervisor::new(clock).expect("rlimit snapshot")
}

#[test]
fn duplicate_submit_returns_exists_and_keeps_the_first_record() {
    let mut sup = supervisor();
    sup.submit_job(manifest("x", "/bin/sh", vec![("on-demand", Value::Bool(true))]))
        .expect("first submit");
    let err = sup
        .submit_job(manifest("x", "/bin/sh", vec![("on-demand", Value::Bool(true))]))
        .unwrap_err();
    assert_eq!(err, ErrorKind::Exists);
    assert!(sup.get_job(Some("x")).is_ok());
}

#[test]
fn on_demand_job_with_no_activation_sources_parks_in_watching() {
    let mut sup = supervisor();
    sup.submit_job(manifest("idle", "/bin/true", vec![])).expect("submit");
    let job = sup.registry.lookup("idle").expect("present");
    assert_eq!(job.state, JobState::Watching);
    assert!(!job.run.is_running());
}

#[test]
fn run_at_load_job_starts_immediately_and_can_be_reaped() {
    let mut sup = supervisor();
    sup.submit_job(manifest(
        "boot",
        "/bin/true",
        vec![("run-at-load", Value::Bool(true))],
    ))
    .expect("submit");

    let pid = sup.registry.lookup("boot").and_then(|j| j.run.pid).expect("running");
    assert_eq!(sup.live_child_count(), 1);

    let status = waitpid(Pid::from_raw(pid), None).expect("waitpid");
    let disposition = match status {
        nix::sys::wait::WaitStatus::Exited(_, code) => Disposition::Exited(code),
        other => panic!("unexpected status: {other:?}"),
    };

    let outcome = sup
        .handle_reap(ReapedChild { pid, disposition })
        .expect("known pid");
    assert_eq!(outcome, ReapOutcome::Rearmed);
    assert_eq!(sup.registry.lookup("boot").expect("still present").state, JobState::Watching);
}

#[test]
fn fast_exit_on_a_continuously_running_job_throttles() {
    let mut sup = supervisor();
    sup.submit_job(manifest(
        "fast",
        "/bin/true",
        vec![("on-demand", Value::Bool(false)), ("run-at-load", Value::Bool(true))],
    ))
    .expect("submit");

    let pid = sup.registry.lookup("fast").and_then(|j| j.run.pid).expect("running");
    waitpid(Pid::from_raw(pid), None).expect("waitpid");

    let outcome = sup
        .handle_reap(ReapedChild {
            pid,
            disposition: Disposition::Exited(0),
        })
        .expect("known pid");
    assert_eq!(outcome, ReapOutcome::ThrottledRestartScheduled);

    let job = sup.registry.lookup("fast").expect("present");
    assert!(job.throttle);
    assert_eq!(job.failed_exits, 1);
    assert!(sup.next_deadline().is_some());
}

#[test]
fn remove_while_running_discards_the_eventual_reap() {
    let mut sup = supervisor();
    sup.submit_job(manifest(
        "long",
        "/bin/sleep",
        vec![
            ("run-at-load", Value::Bool(true)),
            (
                "program-arguments",
                Value::Array(vec![Value::str("/bin/sleep"), Value::str("5")]),
            ),
        ],
    ))
    .expect("submit");

    let pid = sup.registry.lookup("long").and_then(|j| j.run.pid).expect("running");
    sup.remove_job("long").expect("remove");
    assert!(sup.registry.lookup("long").is_none());
    assert_eq!(sup.live_child_count(), 1);

    // SIGTERM was already sent by remove_job; reap it for real so the test
    // doesn't leave a zombie behind.
    let _ = nix::sys::signal::kill(Pid::from_raw(pid), nix::sys::signal::Signal::SIGKILL);
    waitpid(Pid::from_raw(pid), None).expect("waitpid");

    let outcome = sup.handle_reap(ReapedChild {
        pid,
        disposition: Disposition::Signaled(9),
    });
    assert!(outcome.is_none());
    assert_eq!(sup.live_child_count(), 0);
}

#[test]
fn service_ipc_job_without_checkin_is_removed_on_exit() {
    let mut sup = supervisor();
    sup.submit_job(manifest(
        "svc",
        "/bin/true",
        vec![
            ("run-at-load", Value::Bool(true)),
            ("service-ipc", Value::Bool(true)),
        ],
    ))
    .expect("submit");

    let pid = sup.registry.lookup("svc").and_then(|j| j.run.pid).expect("running");
    waitpid(Pid::from_raw(pid), None).expect("waitpid");

    let outcome = sup
        .handle_reap(ReapedChild {
            pid,
            disposition: Disposition::Exited(0),
        })
        .expect("known pid");
    assert_eq!(outcome, ReapOutcome::RemovedNoCheckin);
    assert!(sup.registry.lookup("svc").is_none());
}

#[test]
fn checked_in_service_ipc_job_is_rearmed_instead_of_removed() {
    let mut sup = supervisor();
    sup.submit_job(manifest(
        "svc2",
        "/bin/true",
        vec![
            ("run-at-load", Value::Bool(true)),
            ("service-ipc", Value::Bool(true)),
        ],
    ))
    .expect("submit");
    sup.check_in("svc2").expect("check-in");

    let pid = sup.registry.lookup("svc2").and_then(|j| j.run.pid).expect("running");
    waitpid(Pid::from_raw(pid), None).expect("waitpid");

    let outcome = sup
        .handle_reap(ReapedChild {
            pid,
            disposition: Disposition::Exited(0),
        })
        .expect("known pid");
    assert_eq!(outcome, ReapOutcome::Rearmed);
}

#[test]
fn shutdown_tracks_live_children_until_all_are_reaped() {
    let mut sup = supervisor();
    sup.submit_job(manifest(
        "daemonish",
        "/bin/sleep",
        vec![
            ("run-at-load", Value::Bool(true)),
            (
                "program-arguments",
                Value::Array(vec![Value::str("/bin/sleep"), Value::str("5")]),
            ),
        ],
    ))
    .expect("submit");
    let pid = sup.registry.lookup("daemonish").and_then(|j| j.run.pid).expect("running");

    sup.begin_shutdown();
    assert!(sup.shutdown_in_progress());
    assert_eq!(sup.live_child_count(), 1);

    let _ = nix::sys::signal::kill(Pid::from_raw(pid), nix::sys::signal::Signal::SIGKILL);
    waitpid(Pid::from_raw(pid), None).expect("waitpid");
    sup.handle_reap(ReapedChild {
        pid,
        disposition: Disposition::Signaled(9),
    });
    assert_eq!(sup.live_child_count(), 0);
}
