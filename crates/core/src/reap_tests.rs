use super::*;

#[test]
fn clean_exit_is_neutral() {
    assert_eq!(classify(Disposition::Exited(0)), ReapClass::Neutral);
}

#[test]
fn nonzero_exit_is_bad() {
    assert_eq!(classify(Disposition::Exited(1)), ReapClass::Bad);
}

#[test]
fn sigkill_and_sigterm_are_neutral() {
    assert_eq!(classify(Disposition::Signaled(SIGKILL)), ReapClass::Neutral);
    assert_eq!(classify(Disposition::Signaled(SIGTERM)), ReapClass::Neutral);
}

#[test]
fn other_signals_are_bad() {
    assert_eq!(classify(Disposition::Signaled(11)), ReapClass::Bad); // SIGSEGV
}

#[test]
fn fast_exit_sets_throttle_and_counts_as_bad() {
    let outcome = apply_timing_policy(Duration::from_secs(2), ReapClass::Neutral, 0);
    assert!(outcome.throttle);
    assert_eq!(outcome.failed_exits, 1);
}

#[test]
fn reward_time_resets_before_incrementing() {
    // spec.md §8: a bad reap at >= REWARD_JOB_RUN_TIME must land on
    // failed_exits == 1, not previous-plus-one.
    let outcome = apply_timing_policy(Duration::from_secs(90), ReapClass::Bad, 7);
    assert_eq!(outcome.failed_exits, 1);
    assert!(!outcome.throttle);
}

#[test]
fn long_clean_run_resets_the_counter_without_incrementing() {
    let outcome = apply_timing_policy(Duration::from_secs(90), ReapClass::Neutral, 7);
    assert_eq!(outcome.failed_exits, 0);
    assert!(!outcome.throttle);
}

#[test]
fn mid_range_runtime_neither_throttles_nor_resets() {
    let outcome = apply_timing_policy(Duration::from_secs(30), ReapClass::Neutral, 3);
    assert_eq!(outcome.failed_exits, 3);
    assert!(!outcome.throttle);
}

#[test]
fn threshold_is_inclusive() {
    assert!(!exceeds_failure_threshold(9));
    assert!(exceeds_failure_threshold(10));
}
