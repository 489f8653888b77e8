//! In-process publication of DNS zone updates.
//!
//! Zone providers load zone data and publish it through a [`ZoneNotifier`],
//! which fans each [`Zone`] out to every subscribed [`ZoneObserver`]
//! (resolver-side [`ZoneStore`]s, cache warmers, loggers) with whole-round
//! retries.

pub mod config;
pub mod error;
pub mod notifier;
pub mod observers;
pub mod provider;
pub mod zone;

pub use config::{NotifierConfig, WatcherConfig, ZonecastConfig};
pub use error::{ConfigError, NotifierError, ObserverError, ProviderError};
pub use notifier::{BroadcastReport, SubscriptionHandle, SubscriptionId, ZoneNotifier, ZoneObserver};
pub use provider::{FileWatcherZoneProvider, ZoneProvider};
pub use zone::{Zone, ZoneStore};
