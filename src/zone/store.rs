use super::{RecordType, Result, Zone, ZoneError, ZoneRecord};
use crate::error::ObserverError;
use crate::notifier::ZoneObserver;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Latest published version of each zone, indexed by origin.
///
/// Subscribe a store to a notifier to keep resolver-side lookups current.
pub struct ZoneStore {
    zones: RwLock<HashMap<String, Arc<Zone>>>,
}

impl ZoneStore {
    pub fn new() -> Self {
        Self {
            zones: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a zone. Returns the version it replaced, if any.
    pub fn install(&self, zone: Arc<Zone>) -> Option<Arc<Zone>> {
        let origin = zone.origin.clone();
        let previous = self.zones.write().insert(origin.clone(), zone);
        debug!("Zone {} installed", origin);
        previous
    }

    pub fn remove_zone(&self, origin: &str) -> Result<Arc<Zone>> {
        let origin = origin.trim_end_matches('.').to_lowercase();
        info!("Removing zone: {}", origin);

        self.zones
            .write()
            .remove(&origin)
            .ok_or(ZoneError::ZoneNotFound(origin))
    }

    pub fn get_zone(&self, origin: &str) -> Option<Arc<Zone>> {
        let origin = origin.trim_end_matches('.').to_lowercase();
        self.zones.read().get(&origin).cloned()
    }

    /// Find the most specific zone authoritative for a name
    pub fn find_zone(&self, name: &str) -> Option<Arc<Zone>> {
        self.zones
            .read()
            .values()
            .filter(|zone| zone.is_authoritative_for(name))
            .max_by_key(|zone| zone.origin.len())
            .cloned()
    }

    /// Records for `name` from the authoritative zone
    pub fn lookup(&self, name: &str, rtype: RecordType) -> Vec<ZoneRecord> {
        self.find_zone(name)
            .map(|zone| {
                zone.get_records(name, Some(rtype))
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn list_zones(&self) -> Vec<String> {
        self.zones.read().keys().cloned().collect()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.read().len()
    }
}

impl Default for ZoneStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ZoneObserver for ZoneStore {
    async fn receive(&self, zone: Arc<Zone>) -> std::result::Result<(), ObserverError> {
        let origin = zone.origin.clone();
        let serial = zone.serial;

        // Compare and replace under one write lock so an older serial never wins
        let mut zones = self.zones.write();
        if let Some(current) = zones.get(&origin) {
            if serial_older(serial, current.serial) {
                debug!(
                    "Ignoring zone {} serial {} older than installed serial {}",
                    origin, serial, current.serial
                );
                return Ok(());
            }
        }
        let previous = zones.insert(origin.clone(), zone);
        drop(zones);

        if previous.is_none() {
            info!("Loaded zone {} (serial {})", origin, serial);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "zone-store"
    }
}

/// RFC 1982 serial comparison: whether `serial` precedes `current`
fn serial_older(serial: u32, current: u32) -> bool {
    let distance = current.wrapping_sub(serial);
    distance != 0 && distance < 1 << 31
}
