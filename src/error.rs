use std::time::Duration;
use thiserror::Error;

use crate::zone::ZoneError;

/// Errors surfaced by the zone notifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifierError {
    #[error("Zone notifier has been disposed")]
    Disposed,
}

/// Failure reported by a single observer while receiving a zone
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObserverError {
    #[error("Observer rejected zone {origin}: {reason}")]
    Rejected { origin: String, reason: String },

    #[error("Observer unavailable: {0}")]
    Unavailable(String),

    #[error("Observer did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Observer panicked: {0}")]
    Panicked(String),
}

/// Errors raised by zone providers
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Zone provider already started")]
    AlreadyStarted,

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Zone(#[from] ZoneError),

    #[error(transparent)]
    Notifier(#[from] NotifierError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid max attempts: {0}")]
    InvalidMaxAttempts(String),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid concurrency limit: {0}")]
    InvalidConcurrency(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NotifierError>;
