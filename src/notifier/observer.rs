use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ObserverError;
use crate::zone::Zone;

/// Receiver of zone updates published by a [`ZoneNotifier`](super::ZoneNotifier).
///
/// Implementations must tolerate concurrent calls, duplicate delivery of the
/// same zone (a retried round re-sends to every observer) and no ordering
/// relative to other observers.
#[async_trait]
pub trait ZoneObserver: Send + Sync + 'static {
    /// Handle a published zone. Returning an error marks the round incomplete.
    async fn receive(&self, zone: Arc<Zone>) -> Result<(), ObserverError>;

    /// Name used in logs
    fn name(&self) -> &str {
        "zone-observer"
    }
}
