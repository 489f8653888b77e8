use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::error::ObserverError;
use crate::notifier::ZoneObserver;
use crate::zone::Zone;

/// Logs every zone it receives
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

#[async_trait]
impl ZoneObserver for LoggingObserver {
    async fn receive(&self, zone: Arc<Zone>) -> Result<(), ObserverError> {
        let stats = zone.stats();
        info!(
            origin = %zone.origin,
            serial = zone.serial,
            records = stats.total_records,
            file = zone.file_path.as_deref().unwrap_or("-"),
            "Zone update received"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
