use std::sync::Mutex;

use tempfile::tempdir;

use super::*;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn with_state_dir(f: impl FnOnce(&Config)) {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().expect("tempdir");
    std::env::set_var("WARDEND_STATE_DIR", dir.path());
    let config = Config::load().expect("config");
    f(&config);
    std::env::remove_var("WARDEND_STATE_DIR");
}

#[test]
fn load_derives_every_path_from_the_state_dir() {
    with_state_dir(|config| {
        assert_eq!(config.socket_path, config.state_dir.join(SOCKET_NAME));
        assert_eq!(config.lock_path.file_name().unwrap(), LOCK_NAME);
        assert_eq!(config.version_path.file_name().unwrap(), VERSION_NAME);
        assert_eq!(config.log_path.file_name().unwrap(), LOG_NAME);
    });
}

#[test]
fn startup_creates_the_directory_lock_version_and_socket() {
    with_state_dir(|config| {
        let result = startup(config).expect("startup");
        assert!(config.state_dir.is_dir());
        assert!(config.lock_path.exists());
        assert!(config.version_path.exists());
        assert!(config.socket_path.exists());
        drop(result.lock_file);
        shutdown(config);
        assert!(!config.socket_path.exists());
        assert!(!config.version_path.exists());
    });
}

#[test]
fn a_second_startup_against_a_held_lock_fails_without_touching_files() {
    with_state_dir(|config| {
        let first = startup(config).expect("first startup");

        let err = startup(config).unwrap_err();
        assert!(matches!(err, LifecycleError::LockFailed(_)));
        assert!(config.version_path.exists());
        assert!(config.socket_path.exists());

        drop(first.lock_file);
    });
}

#[test]
fn startup_sets_restrictive_permissions_on_the_state_directory() {
    use std::os::unix::fs::PermissionsExt;
    with_state_dir(|config| {
        let _ = startup(config).expect("startup");
        let mode = std::fs::metadata(&config.state_dir).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, DIR_MODE);
    });
}
