use super::*;

#[test]
fn from_manifest_key_round_trips_known_keys() {
    let keys = [
        "core",
        "cpu",
        "data",
        "file-size",
        "memory-lock",
        "number-of-files",
        "number-of-processes",
        "resident-set-size",
        "stack",
    ];
    for key in keys {
        assert!(RlimitKind::from_manifest_key(key).is_some(), "key {key} should map");
    }
    assert!(RlimitKind::from_manifest_key("not-a-real-limit").is_none());
}

#[test]
fn refresh_all_populates_every_known_kind() {
    let mut cache = RlimitCache::new();
    cache.refresh_all().expect("reading own rlimits should never fail");
    assert_eq!(cache.get().len(), 9);
}

#[test]
fn setting_back_the_current_value_is_a_no_op_observationally() {
    let mut cache = RlimitCache::new();
    cache.refresh_all().expect("refresh");
    let current = *cache.get().get(&RlimitKind::NumberOfFiles).expect("nofile present");

    let after = cache.set(RlimitKind::NumberOfFiles, current).expect("set back to current");
    assert_eq!(after, current);
}

#[test]
fn process_count_hard_limit_is_clamped_to_the_ceiling() {
    let mut cache = RlimitCache::new();
    cache.refresh_all().expect("refresh");
    let current = *cache
        .get()
        .get(&RlimitKind::NumberOfProcesses)
        .expect("nproc present");

    // Requesting a hard limit under the ceiling and under the current hard
    // limit should be accepted unchanged (lowering a limit never needs
    // privilege).
    let requested = RlimitPair {
        soft: current.soft.min(PROCESS_MAX_CEILING),
        hard: current.hard.min(PROCESS_MAX_CEILING),
    };
    let after = cache.set(RlimitKind::NumberOfProcesses, requested).expect("set");
    assert!(after.hard <= PROCESS_MAX_CEILING);
}
