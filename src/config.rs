use crate::error::ConfigError;
use std::path::Path;
use std::time::Duration;

/// Broadcast and retry settings for a [`ZoneNotifier`](crate::notifier::ZoneNotifier)
#[derive(Debug, Clone, PartialEq)]
pub struct NotifierConfig {
    /// Total broadcast rounds per notify call (initial round included)
    pub max_attempts: u32,

    /// Per-observer deadline; a timed out delivery makes the round incomplete (None = no limit)
    pub observer_timeout: Option<Duration>,

    /// Pause between an incomplete round and the next attempt
    pub retry_delay: Duration,

    /// Max observers receiving concurrently within a round (0 = unbounded)
    pub max_concurrent_deliveries: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            observer_timeout: None,
            retry_delay: Duration::ZERO,
            max_concurrent_deliveries: 0,
        }
    }
}

impl NotifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(ConfigError::InvalidMaxAttempts(format!(
                "{} (must be between 1 and 10)",
                self.max_attempts
            )));
        }

        if let Some(timeout) = self.observer_timeout {
            if timeout.is_zero() || timeout.as_secs() > 300 {
                return Err(ConfigError::InvalidTimeout(
                    "Observer timeout must be between 1ms and 300 seconds".to_string(),
                ));
            }
        }

        if self.retry_delay.as_secs() > 300 {
            return Err(ConfigError::InvalidTimeout(
                "Retry delay too large (max 300 seconds)".to_string(),
            ));
        }

        if self.max_concurrent_deliveries > 100_000 {
            return Err(ConfigError::InvalidConcurrency(
                "Too many concurrent deliveries (max 100000)".to_string(),
            ));
        }

        Ok(())
    }
}

/// Zone file watching settings
#[derive(Debug, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Zone files to watch and publish
    pub zone_files: Vec<String>,

    /// Quiet period after a file event before the zone is reloaded
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            zone_files: vec![],
            debounce: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZonecastConfig {
    pub notifier: NotifierConfig,
    pub watcher: WatcherConfig,
}

impl ZonecastConfig {
    /// Create a config from `ZONECAST_*` environment variables over the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(attempts) = std::env::var("ZONECAST_MAX_ATTEMPTS") {
            config.notifier.max_attempts = attempts
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidMaxAttempts(attempts))?;
        }

        if let Ok(timeout_ms) = std::env::var("ZONECAST_OBSERVER_TIMEOUT_MS") {
            let ms = timeout_ms
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(timeout_ms.clone()))?;
            // 0 disables the per-observer timeout
            config.notifier.observer_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        if let Ok(delay_ms) = std::env::var("ZONECAST_RETRY_DELAY_MS") {
            config.notifier.retry_delay = Duration::from_millis(
                delay_ms
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout(delay_ms.clone()))?,
            );
        }

        if let Ok(max_concurrent) = std::env::var("ZONECAST_MAX_CONCURRENT_DELIVERIES") {
            config.notifier.max_concurrent_deliveries = max_concurrent
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidConcurrency(max_concurrent))?;
        }

        if let Ok(zone_files) = std::env::var("ZONECAST_ZONE_FILES") {
            config.watcher.zone_files = zone_files
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(debounce_ms) = std::env::var("ZONECAST_WATCH_DEBOUNCE_MS") {
            config.watcher.debounce = Duration::from_millis(
                debounce_ms
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout(debounce_ms.clone()))?,
            );
        }

        config.validate()?;

        Ok(config)
    }

    /// Load a TOML file on top of the current values
    pub fn from_toml_file<P: AsRef<Path>>(path: P, base: &Self) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let value: toml::Value = toml::from_str(&content)?;

        let mut config = base.clone();
        config.apply_partial_update(&value)?;
        config.validate()?;

        Ok(config)
    }

    /// Apply the keys present in a TOML document; absent keys keep their value.
    ///
    /// ```toml
    /// [notifier]
    /// max_attempts = 3
    /// observer_timeout_ms = 2000
    /// retry_delay_ms = 0
    /// max_concurrent_deliveries = 0
    ///
    /// [watcher]
    /// zone_files = ["zones/example.com.zone"]
    /// debounce_ms = 100
    /// ```
    pub fn apply_partial_update(&mut self, value: &toml::Value) -> Result<(), ConfigError> {
        if let Some(notifier) = value.get("notifier") {
            if let Some(attempts) = get_u64(notifier, "max_attempts")? {
                self.notifier.max_attempts = u32::try_from(attempts)
                    .map_err(|_| ConfigError::InvalidMaxAttempts(attempts.to_string()))?;
            }
            if let Some(ms) = get_u64(notifier, "observer_timeout_ms")? {
                self.notifier.observer_timeout = (ms > 0).then(|| Duration::from_millis(ms));
            }
            if let Some(ms) = get_u64(notifier, "retry_delay_ms")? {
                self.notifier.retry_delay = Duration::from_millis(ms);
            }
            if let Some(max) = get_u64(notifier, "max_concurrent_deliveries")? {
                self.notifier.max_concurrent_deliveries = max as usize;
            }
        }

        if let Some(watcher) = value.get("watcher") {
            if let Some(files) = watcher.get("zone_files") {
                let files = files.as_array().ok_or_else(|| {
                    ConfigError::ParseError("watcher.zone_files must be an array".to_string())
                })?;
                self.watcher.zone_files = files
                    .iter()
                    .map(|f| {
                        f.as_str().map(str::to_string).ok_or_else(|| {
                            ConfigError::ParseError(format!("Invalid zone file entry: {}", f))
                        })
                    })
                    .collect::<Result<_, _>>()?;
            }
            if let Some(ms) = get_u64(watcher, "debounce_ms")? {
                self.watcher.debounce = Duration::from_millis(ms);
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.notifier.validate()?;

        if self.watcher.debounce.as_secs() > 60 {
            return Err(ConfigError::InvalidTimeout(
                "Watch debounce too large (max 60 seconds)".to_string(),
            ));
        }

        Ok(())
    }
}

fn get_u64(table: &toml::Value, key: &str) -> Result<Option<u64>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_integer()
            .and_then(|i| u64::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| ConfigError::ParseError(format!("{} must be a non-negative integer", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ZonecastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.notifier.max_attempts, 3);
        assert_eq!(config.notifier.observer_timeout, None);
    }

    #[test]
    fn test_invalid_max_attempts() {
        let config = NotifierConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = NotifierConfig {
            max_attempts: 11,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_timeout() {
        let config = NotifierConfig {
            observer_timeout: Some(Duration::from_secs(400)),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_update_keeps_unset_values() {
        let mut config = ZonecastConfig::default();
        let value: toml::Value = toml::from_str(
            r#"
            [notifier]
            observer_timeout_ms = 1500

            [watcher]
            zone_files = ["a.zone", "b.zone"]
            "#,
        )
        .unwrap();

        config.apply_partial_update(&value).unwrap();

        assert_eq!(config.notifier.max_attempts, 3);
        assert_eq!(
            config.notifier.observer_timeout,
            Some(Duration::from_millis(1500))
        );
        assert_eq!(config.watcher.zone_files, vec!["a.zone", "b.zone"]);
        assert_eq!(config.watcher.debounce, Duration::from_millis(100));
    }

    #[test]
    fn test_partial_update_rejects_bad_types() {
        let mut config = ZonecastConfig::default();
        let value: toml::Value = toml::from_str("[notifier]\nmax_attempts = \"three\"").unwrap();
        assert!(config.apply_partial_update(&value).is_err());
    }
}
