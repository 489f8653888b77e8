pub mod file_watcher;

pub use file_watcher::FileWatcherZoneProvider;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{NotifierError, ProviderError};
use crate::notifier::{SubscriptionHandle, ZoneNotifier, ZoneObserver};

/// A source of zone data that publishes through its own [`ZoneNotifier`].
#[async_trait]
pub trait ZoneProvider: Send + Sync {
    fn notifier(&self) -> &Arc<ZoneNotifier>;

    /// Begin producing zones
    async fn start(&self) -> Result<(), ProviderError>;

    /// Stop producing zones. Safe to call more than once.
    async fn stop(&self);

    fn subscribe(
        &self,
        observer: Arc<dyn ZoneObserver>,
    ) -> Result<SubscriptionHandle, NotifierError> {
        self.notifier().subscribe(observer)
    }

    /// Stop the provider and release its notifier
    async fn dispose(&self) {
        self.stop().await;
        self.notifier().dispose().await;
    }
}
