use warden_core::value::{Mapping, Value};
use warden_core::Job;

use super::*;

fn job_with(pairs: Vec<(&str, Value)>) -> Job {
    let mut map = Mapping::new();
    map.insert("label", Value::str("t"));
    map.insert("program", Value::str("/bin/true"));
    map.insert("program-arguments", Value::Array(vec![Value::str("true")]));
    for (k, v) in pairs {
        map.insert(k, v);
    }
    Job::from_manifest(Value::Map(map)).expect("valid manifest")
}

#[test]
fn arming_a_job_with_no_watch_sources_reports_inactive() {
    let job = job_with(vec![]);
    let mut table = ActivationTable::new();
    let active = table.arm_watches(&job).expect("arm");
    assert!(!active);
}

#[test]
fn ensure_sockets_is_idempotent_for_a_job_with_no_sockets() {
    let job = job_with(vec![]);
    let mut table = ActivationTable::new();
    table.ensure_sockets(&job).expect("ensure");
    table.ensure_sockets(&job).expect("ensure again");
    assert!(table.socket_fds(job.label.as_str()).is_empty());
}

#[test]
fn disarm_watches_leaves_sockets_untouched() {
    let job = job_with(vec![]);
    let mut table = ActivationTable::new();
    table.ensure_sockets(&job).expect("ensure");
    table.arm_watches(&job).expect("arm");
    table.disarm_watches(job.label.as_str());
    assert!(table.labels().any(|l| l == job.label.as_str()));
}

#[test]
fn remove_drops_the_whole_entry() {
    let job = job_with(vec![]);
    let mut table = ActivationTable::new();
    table.ensure_sockets(&job).expect("ensure");
    table.remove(job.label.as_str());
    assert!(!table.labels().any(|l| l == job.label.as_str()));
}

#[test]
fn queue_directory_non_empty_at_arm_time_reports_active() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("item"), b"x").expect("write");

    let job = job_with(vec![(
        "queue-directories",
        Value::Array(vec![Value::str(dir.path().to_string_lossy().into_owned())]),
    )]);
    let mut table = ActivationTable::new();
    let active = table.arm_watches(&job).expect("arm");
    assert!(active);
}

#[test]
fn parses_a_calendar_interval() {
    let mut cal = Mapping::new();
    cal.insert("hour", Value::Int(4));
    cal.insert("minute", Value::Int(30));
    let manifest = Value::Map({
        let mut m = Mapping::new();
        m.insert("start-calendar-interval", Value::Map(cal));
        m
    });

    let spec = parse_calendar_interval(&manifest).expect("spec");
    assert_eq!(spec.hour, Some(4));
    assert_eq!(spec.minute, Some(30));
    assert_eq!(spec.month, None);
}

#[test]
fn missing_calendar_interval_parses_to_none() {
    let manifest = Value::Map(Mapping::new());
    assert!(parse_calendar_interval(&manifest).is_none());
}

#[test]
fn weekday_seven_maps_to_sunday() {
    // spec.md §4.7: weekday 0-6, where 7 also means Sunday.
    let mut cal = Mapping::new();
    cal.insert("weekday", Value::Int(7));
    let manifest = Value::Map({
        let mut m = Mapping::new();
        m.insert("start-calendar-interval", Value::Map(cal));
        m
    });

    let spec = parse_calendar_interval(&manifest).expect("spec");
    assert_eq!(spec.weekday, Some(0));
}
