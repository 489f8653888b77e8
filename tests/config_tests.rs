use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;
use zonecast::{ConfigError, ZonecastConfig};

// Tests that modify environment variables must not run concurrently
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: [&str; 6] = [
    "ZONECAST_MAX_ATTEMPTS",
    "ZONECAST_OBSERVER_TIMEOUT_MS",
    "ZONECAST_RETRY_DELAY_MS",
    "ZONECAST_MAX_CONCURRENT_DELIVERIES",
    "ZONECAST_ZONE_FILES",
    "ZONECAST_WATCH_DEBOUNCE_MS",
];

fn clear_env() {
    for var in VARS {
        unsafe {
            std::env::remove_var(var);
        }
    }
}

#[test]
fn test_from_env_defaults() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();

    let config = ZonecastConfig::from_env().unwrap();
    assert_eq!(config, ZonecastConfig::default());
}

#[test]
fn test_from_env_overrides() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();

    unsafe {
        std::env::set_var("ZONECAST_MAX_ATTEMPTS", "5");
        std::env::set_var("ZONECAST_OBSERVER_TIMEOUT_MS", "250");
        std::env::set_var("ZONECAST_ZONE_FILES", "a.zone, b.zone,,");
        std::env::set_var("ZONECAST_WATCH_DEBOUNCE_MS", "20");
    }

    let config = ZonecastConfig::from_env();
    clear_env();
    let config = config.unwrap();

    assert_eq!(config.notifier.max_attempts, 5);
    assert_eq!(
        config.notifier.observer_timeout,
        Some(Duration::from_millis(250))
    );
    assert_eq!(config.watcher.zone_files, vec!["a.zone", "b.zone"]);
    assert_eq!(config.watcher.debounce, Duration::from_millis(20));
}

#[test]
fn test_from_env_rejects_invalid_values() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();

    unsafe {
        std::env::set_var("ZONECAST_MAX_ATTEMPTS", "lots");
    }
    let result = ZonecastConfig::from_env();
    assert!(matches!(result, Err(ConfigError::InvalidMaxAttempts(_))));

    unsafe {
        std::env::set_var("ZONECAST_MAX_ATTEMPTS", "0");
    }
    let result = ZonecastConfig::from_env();
    clear_env();
    assert!(matches!(result, Err(ConfigError::InvalidMaxAttempts(_))));
}

#[test]
fn test_from_toml_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[notifier]
max_attempts = 2
retry_delay_ms = 10
max_concurrent_deliveries = 8

[watcher]
zone_files = ["zones/example.com.zone"]
"#
    )
    .unwrap();

    let config = ZonecastConfig::from_toml_file(file.path(), &ZonecastConfig::default()).unwrap();

    assert_eq!(config.notifier.max_attempts, 2);
    assert_eq!(config.notifier.retry_delay, Duration::from_millis(10));
    assert_eq!(config.notifier.max_concurrent_deliveries, 8);
    assert_eq!(config.notifier.observer_timeout, None);
    assert_eq!(config.watcher.zone_files, vec!["zones/example.com.zone"]);
}

#[test]
fn test_from_toml_file_validates() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[notifier]\nmax_attempts = 50").unwrap();

    let result = ZonecastConfig::from_toml_file(file.path(), &ZonecastConfig::default());
    assert!(matches!(result, Err(ConfigError::InvalidMaxAttempts(_))));
}

#[test]
fn test_from_toml_file_syntax_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[notifier\nmax_attempts = ").unwrap();

    let result = ZonecastConfig::from_toml_file(file.path(), &ZonecastConfig::default());
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}
