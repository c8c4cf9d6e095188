use std::path::PathBuf;
use std::sync::Mutex;

use super::*;

// `std::env::set_var` mutates process-wide state; serialize every test
// that touches it so they don't observe each other's overrides under the
// default multi-threaded test runner.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn with_env_lock(f: impl FnOnce()) {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    f();
}

#[test]
fn state_dir_prefers_explicit_override() {
    with_env_lock(|| {
        std::env::set_var("WARDEND_STATE_DIR", "/tmp/wardend-explicit");
        std::env::remove_var("XDG_STATE_HOME");
        let dir = state_dir().expect("resolved");
        assert_eq!(dir, PathBuf::from("/tmp/wardend-explicit"));
        std::env::remove_var("WARDEND_STATE_DIR");
    });
}

#[test]
fn state_dir_falls_back_to_xdg_state_home() {
    with_env_lock(|| {
        std::env::remove_var("WARDEND_STATE_DIR");
        std::env::set_var("XDG_STATE_HOME", "/tmp/xdg-state");
        let dir = state_dir().expect("resolved");
        assert_eq!(dir, PathBuf::from("/tmp/xdg-state/wardend"));
        std::env::remove_var("XDG_STATE_HOME");
    });
}

#[test]
fn empty_overrides_are_treated_as_unset() {
    with_env_lock(|| {
        std::env::set_var("WARDEND_STATE_DIR", "");
        std::env::set_var("XDG_STATE_HOME", "");
        let dir = state_dir();
        std::env::remove_var("WARDEND_STATE_DIR");
        std::env::remove_var("XDG_STATE_HOME");
        // Falls through to $HOME/.local/state/wardend (or NoStateDir if
        // $HOME is also unset) — either way, never an empty path.
        if let Ok(dir) = dir {
            assert!(!dir.as_os_str().is_empty());
        }
    });
}

#[test]
fn timer_check_ms_is_absent_by_default() {
    with_env_lock(|| {
        std::env::remove_var("WARDEND_TIMER_CHECK_MS");
        assert_eq!(timer_check_ms(), None);
    });
}

#[test]
fn timer_check_ms_parses_a_valid_override() {
    with_env_lock(|| {
        std::env::set_var("WARDEND_TIMER_CHECK_MS", "25");
        assert_eq!(timer_check_ms(), Some(25));
        std::env::remove_var("WARDEND_TIMER_CHECK_MS");
    });
}

#[test]
fn timer_check_ms_ignores_garbage() {
    with_env_lock(|| {
        std::env::set_var("WARDEND_TIMER_CHECK_MS", "not-a-number");
        assert_eq!(timer_check_ms(), None);
        std::env::remove_var("WARDEND_TIMER_CHECK_MS");
    });
}
