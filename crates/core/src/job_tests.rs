use super::*;
use crate::value::Value;

fn manifest_with(label: &str, extra: impl FnOnce(&mut Mapping)) -> Value {
    let mut m = Mapping::new();
    m.insert("label", Value::str(label));
    m.insert("program", Value::str("/bin/cat"));
    m.insert("program-arguments", Value::Array(vec![Value::str("/bin/cat")]));
    extra(&mut m);
    Value::Map(m)
}

#[test]
fn builds_a_job_from_a_valid_manifest() {
    let job = Job::from_manifest(manifest_with("echo", |_| {})).expect("valid manifest");
    assert_eq!(job.label.as_str(), "echo");
    assert_eq!(job.state, JobState::Loaded);
    assert!(!job.run.is_running());
    assert!(job.on_demand, "default on-demand is true per spec.md §3");
}

#[test]
fn rejects_manifest_missing_both_program_and_arguments() {
    let mut m = Mapping::new();
    m.insert("label", Value::str("broken"));
    let err = Job::from_manifest(Value::Map(m)).unwrap_err();
    assert!(matches!(err, ErrorKind::InvalidArgument(_)));
}

#[test]
fn accepts_manifest_with_program_but_no_program_arguments() {
    // spec.md §4.4: invalid only when program *and* program-arguments are
    // both missing; a bare `program` is a valid submission (see the
    // end-to-end scenarios in §8, none of which set program-arguments).
    let mut m = Mapping::new();
    m.insert("label", Value::str("echo"));
    m.insert("program", Value::str("/bin/cat"));
    let job = Job::from_manifest(Value::Map(m)).expect("program alone is sufficient");
    assert_eq!(job.label.as_str(), "echo");
}

#[test]
fn rejects_non_mapping_manifest() {
    let err = Job::from_manifest(Value::Array(vec![])).unwrap_err();
    assert!(matches!(err, ErrorKind::InvalidArgument(_)));
}

#[test]
fn wants_activation_armed_only_when_idle_on_demand_and_not_throttled() {
    let mut job = Job::from_manifest(manifest_with("svc", |_| {})).expect("valid manifest");
    assert!(job.wants_activation_armed(false));

    job.run.pid = Some(123);
    assert!(!job.wants_activation_armed(false));

    job.run.pid = None;
    job.throttle = true;
    assert!(!job.wants_activation_armed(false));

    job.throttle = false;
    assert!(!job.wants_activation_armed(true));
}

#[test]
fn watch_paths_and_queue_directories_start_unarmed() {
    let job = Job::from_manifest(manifest_with("watcher", |m| {
        m.insert(
            "watch-paths",
            Value::Array(vec![Value::str("/tmp/a"), Value::str("/tmp/b")]),
        );
    }))
    .expect("valid manifest");
    assert_eq!(job.watch_paths.len(), 2);
    assert!(job.watch_paths.iter().all(|w| !w.is_armed()));
    assert!(job.has_activation_sources());
}

#[test]
fn zero_start_interval_is_treated_as_disabled() {
    let job = Job::from_manifest(manifest_with("timer", |m| {
        m.insert("start-interval", Value::Int(0));
    }))
    .expect("valid manifest");
    assert!(job.start_interval.is_none());
}
