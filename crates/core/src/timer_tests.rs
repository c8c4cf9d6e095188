use super::*;

#[test]
fn constructors_tag_the_job_label() {
    let job = JobId::new("echo");
    assert!(TimerId::start_interval(&job).is_start_interval());
    assert!(TimerId::calendar(&job).is_calendar());
    assert!(TimerId::throttle_restart(&job).is_throttle_restart());
}

#[test]
fn job_label_extracts_regardless_of_kind() {
    let job = JobId::new("echo");
    assert_eq!(TimerId::start_interval(&job).job_label(), Some("echo"));
    assert_eq!(TimerId::calendar(&job).job_label(), Some("echo"));
    assert_eq!(TimerId::throttle_restart(&job).job_label(), Some("echo"));
}

#[test]
fn kinds_are_mutually_exclusive() {
    let job = JobId::new("echo");
    let t = TimerId::calendar(&job);
    assert!(!t.is_start_interval());
    assert!(!t.is_throttle_restart());
}
