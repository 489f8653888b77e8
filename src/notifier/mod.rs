//! Zone update fan-out.
//!
//! A [`ZoneNotifier`] keeps the set of subscribed [`ZoneObserver`]s and
//! broadcasts each published [`Zone`] to all of them concurrently. A broadcast
//! round only counts as complete when every delivery returned `Ok`; otherwise
//! the whole round is repeated against the same snapshot, up to
//! [`NotifierConfig::max_attempts`] rounds in total.
//!
//! ```text
//! notify(zone) ──► snapshot ──► round 1 ──┬─► observer A.receive(zone)
//!                                         ├─► observer B.receive(zone)
//!                                         └─► observer C.receive(zone)
//!                              all Ok? ── yes ──► done
//!                                 └────── no ───► round 2 ... (max_attempts)
//! ```

mod observer;
mod subscriber_set;

pub use observer::ZoneObserver;
pub use subscriber_set::{SubscriberSet, SubscriptionHandle, SubscriptionId};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::NotifierConfig;
use crate::error::{NotifierError, ObserverError, Result};
use crate::zone::Zone;

/// One finished delivery: registration, observer name and result
type Delivery = (SubscriptionId, String, std::result::Result<(), ObserverError>);

/// Outcome of one `notify` call. Informational only: an incomplete broadcast
/// is not an error for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub origin: String,
    pub serial: u32,
    /// Registrations in the snapshot the broadcast was sent to
    pub subscribers: usize,
    /// Rounds performed, including the first
    pub rounds: u32,
    /// Whether the last round had every delivery succeed
    pub completed: bool,
    /// Failed deliveries in the last round
    pub failed_deliveries: usize,
}

/// Publishes zones to a dynamic set of observers.
///
/// `notify` calls are serialized so two broadcasts never interleave. The
/// deliveries of a broadcast whose caller gave up on it are aborted and
/// awaited before the next broadcast or `dispose` proceeds. After
/// [`dispose`](Self::dispose) both `subscribe` and `notify` fail with
/// [`NotifierError::Disposed`].
pub struct ZoneNotifier {
    config: NotifierConfig,
    subscribers: Arc<SubscriberSet>,
    /// Held for a whole broadcast; holds the deliveries of the current round
    deliveries: Mutex<JoinSet<Delivery>>,
    delivery_permits: Option<Arc<Semaphore>>,
    disposed: AtomicBool,
}

impl ZoneNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        let delivery_permits = (config.max_concurrent_deliveries > 0)
            .then(|| Arc::new(Semaphore::new(config.max_concurrent_deliveries)));

        Self {
            config,
            subscribers: Arc::new(SubscriberSet::new()),
            deliveries: Mutex::new(JoinSet::new()),
            delivery_permits,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    /// Register an observer. Subscribing the same observer twice registers it
    /// twice; each handle cancels only its own registration.
    pub fn subscribe(&self, observer: Arc<dyn ZoneObserver>) -> Result<SubscriptionHandle> {
        self.ensure_active()?;

        let name = observer.name().to_string();
        let id = self.subscribers.insert(observer);

        // dispose() may have cleared the set between the check and the insert
        if self.is_disposed() {
            self.subscribers.remove(id);
            return Err(NotifierError::Disposed);
        }

        debug!("Observer {} subscribed as {}", name, id);
        Ok(SubscriptionHandle::new(id, &self.subscribers))
    }

    /// Broadcast a zone to every currently registered observer.
    ///
    /// Waits for each round to finish. Observers subscribed or cancelled while
    /// a broadcast is running do not affect it. Exhausting all rounds is
    /// logged and reported in the returned [`BroadcastReport`].
    pub async fn notify(&self, zone: impl Into<Arc<Zone>>) -> Result<BroadcastReport> {
        let zone = zone.into();
        self.ensure_active()?;

        let mut deliveries = self.deliveries.lock().await;
        self.ensure_active()?;
        // Leftovers of a broadcast whose notify future was dropped mid-round
        deliveries.shutdown().await;

        let snapshot = self.subscribers.snapshot();
        let mut report = BroadcastReport {
            origin: zone.origin.clone(),
            serial: zone.serial,
            subscribers: snapshot.len(),
            rounds: 0,
            completed: false,
            failed_deliveries: 0,
        };

        debug!(
            "Publishing zone {} (serial {}) to {} observers",
            zone.origin,
            zone.serial,
            snapshot.len()
        );

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 && !self.config.retry_delay.is_zero() {
                tokio::time::sleep(self.config.retry_delay).await;
            }

            report.rounds = attempt;
            report.failed_deliveries = self
                .broadcast_round(&mut deliveries, &zone, &snapshot, attempt)
                .await;

            if report.failed_deliveries == 0 {
                report.completed = true;
                break;
            }

            debug!(
                "Round {}/{} for zone {} incomplete: {} of {} deliveries failed",
                attempt,
                self.config.max_attempts,
                zone.origin,
                report.failed_deliveries,
                report.subscribers
            );
        }

        if !report.completed {
            warn!(
                "Giving up on zone {} (serial {}) after {} rounds; {} deliveries still failing",
                zone.origin, zone.serial, report.rounds, report.failed_deliveries
            );
        }

        Ok(report)
    }

    /// One concurrent fan-out over the snapshot; returns the number of failed deliveries
    async fn broadcast_round(
        &self,
        deliveries: &mut JoinSet<Delivery>,
        zone: &Arc<Zone>,
        snapshot: &[(SubscriptionId, Arc<dyn ZoneObserver>)],
        attempt: u32,
    ) -> usize {
        for (id, observer) in snapshot {
            let id = *id;
            let observer = Arc::clone(observer);
            let zone = Arc::clone(zone);
            let permits = self.delivery_permits.clone();
            let deadline = self.config.observer_timeout;

            deliveries.spawn(async move {
                let name = observer.name().to_string();
                let _permit = match permits {
                    Some(permits) => match permits.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => {
                            let closed =
                                ObserverError::Unavailable("delivery permits closed".to_string());
                            return (id, name, Err(closed));
                        }
                    },
                    None => None,
                };
                let outcome = deliver(observer.as_ref(), zone, deadline).await;
                (id, name, outcome)
            });
        }

        let mut failed = 0;
        while let Some(joined) = deliveries.join_next().await {
            match joined {
                Ok((_, _, Ok(()))) => {}
                Ok((id, name, Err(e))) => {
                    failed += 1;
                    warn!("Observer {} ({}) failed on round {}: {}", name, id, attempt, e);
                }
                Err(e) => {
                    failed += 1;
                    warn!("Delivery failed on round {}: {}", attempt, join_failure(e));
                }
            }
        }

        failed
    }

    /// Stop accepting work and release the subscribers.
    ///
    /// A broadcast already in progress is allowed to finish first; deliveries
    /// left behind by a dropped `notify` are aborted. Calling `dispose` again
    /// is a no-op.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut deliveries = self.deliveries.lock().await;
        deliveries.shutdown().await;
        let released = self.subscribers.clear();
        if let Some(permits) = &self.delivery_permits {
            permits.close();
        }

        info!("Zone notifier disposed, released {} subscriptions", released);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(NotifierError::Disposed);
        }
        Ok(())
    }
}

impl Default for ZoneNotifier {
    fn default() -> Self {
        Self::new(NotifierConfig::default())
    }
}

async fn deliver(
    observer: &dyn ZoneObserver,
    zone: Arc<Zone>,
    deadline: Option<Duration>,
) -> std::result::Result<(), ObserverError> {
    match deadline {
        Some(limit) => timeout(limit, observer.receive(zone))
            .await
            .map_err(|_| ObserverError::Timeout(limit))?,
        None => observer.receive(zone).await,
    }
}

fn join_failure(err: JoinError) -> ObserverError {
    if !err.is_panic() {
        return ObserverError::Unavailable("delivery task cancelled".to_string());
    }

    let panic = err.into_panic();
    let message = if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    };
    ObserverError::Panicked(message)
}
