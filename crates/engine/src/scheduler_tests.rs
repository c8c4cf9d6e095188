use super::*;

#[test]
fn timer_fires_once_due() {
    let mut s = Scheduler::new();
    let now = Instant::now();
    let id = TimerId::new("x");
    s.set_timer(&id, Duration::from_secs(1), now);
    assert!(s.fired_timers(now).is_empty());
    assert_eq!(s.fired_timers(now + Duration::from_secs(1)), vec![id]);
}

#[test]
fn set_timer_replaces_existing_registration() {
    let mut s = Scheduler::new();
    let now = Instant::now();
    let id = TimerId::new("x");
    s.set_timer(&id, Duration::from_secs(10), now);
    s.set_timer(&id, Duration::from_secs(1), now);
    assert_eq!(s.fired_timers(now + Duration::from_secs(1)), vec![id]);
}

#[test]
fn cancel_removes_the_timer() {
    let mut s = Scheduler::new();
    let now = Instant::now();
    let id = TimerId::new("x");
    s.set_timer(&id, Duration::from_secs(1), now);
    s.cancel_timer(&id);
    assert!(s.fired_timers(now + Duration::from_secs(5)).is_empty());
}

#[test]
fn cancel_timers_for_job_only_touches_that_jobs_timers() {
    use warden_core::job::JobId;

    let mut s = Scheduler::new();
    let now = Instant::now();
    let a = JobId::new("a");
    let b = JobId::new("b");
    s.set_timer(&TimerId::start_interval(&a), Duration::from_secs(1), now);
    s.set_timer(&TimerId::calendar(&b), Duration::from_secs(1), now);

    s.cancel_timers_for_job("a");

    let fired = s.fired_timers(now + Duration::from_secs(5));
    assert_eq!(fired, vec![TimerId::calendar(&b)]);
}

#[test]
fn next_deadline_is_the_earliest_pending_timer() {
    let mut s = Scheduler::new();
    let now = Instant::now();
    s.set_timer(&TimerId::new("late"), Duration::from_secs(10), now);
    s.set_timer(&TimerId::new("soon"), Duration::from_secs(1), now);
    assert_eq!(s.next_deadline(), Some(now + Duration::from_secs(1)));
}

#[test]
fn has_timers_reflects_emptiness() {
    let mut s = Scheduler::new();
    assert!(!s.has_timers());
    let now = Instant::now();
    s.set_timer(&TimerId::new("x"), Duration::from_secs(1), now);
    assert!(s.has_timers());
}
