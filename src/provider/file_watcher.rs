use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, error, info, warn};

use super::ZoneProvider;
use crate::config::WatcherConfig;
use crate::error::{NotifierError, ProviderError};
use crate::notifier::{BroadcastReport, ZoneNotifier};
use crate::zone::{Zone, ZoneError, ZoneParser};

struct WatchTask {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// Publishes a zone file on start and again every time the file changes.
///
/// Bursts of file events are collapsed: the file is reparsed once no new
/// event has arrived for the debounce period. A file that fails to parse or
/// validate is logged and skipped, so observers keep the last good zone.
pub struct FileWatcherZoneProvider {
    path: PathBuf,
    debounce: Duration,
    notifier: Arc<ZoneNotifier>,
    watch: Mutex<Option<WatchTask>>,
}

impl FileWatcherZoneProvider {
    pub fn new(path: impl Into<PathBuf>, debounce: Duration, notifier: Arc<ZoneNotifier>) -> Self {
        Self {
            path: path.into(),
            debounce,
            notifier,
            watch: Mutex::new(None),
        }
    }

    pub fn from_config(
        path: impl Into<PathBuf>,
        config: &WatcherConfig,
        notifier: Arc<ZoneNotifier>,
    ) -> Self {
        Self::new(path, config.debounce, notifier)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn is_running(&self) -> bool {
        self.watch.lock().await.is_some()
    }

    /// Reparse the file and publish it immediately
    pub async fn reload_now(&self) -> Result<BroadcastReport, ProviderError> {
        publish_file(&self.path, &self.notifier).await
    }
}

#[async_trait]
impl ZoneProvider for FileWatcherZoneProvider {
    fn notifier(&self) -> &Arc<ZoneNotifier> {
        &self.notifier
    }

    async fn start(&self) -> Result<(), ProviderError> {
        let mut watch = self.watch.lock().await;
        if watch.is_some() {
            return Err(ProviderError::AlreadyStarted);
        }

        info!("Starting zone file watcher for: {}", self.path.display());

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher: RecommendedWatcher = Watcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    if let Err(e) = event_tx.send(event) {
                        debug!("Dropping file watch event: {}", e);
                    }
                }
                Err(e) => error!("File watch error: {}", e),
            },
            notify::Config::default(),
        )?;

        // Watching the directory survives editors that replace the file on save
        watcher.watch(watch_dir(&self.path), RecursiveMode::NonRecursive)?;

        // Armed before the first load so an edit made meanwhile is not missed
        let report = publish_file(&self.path, &self.notifier).await?;
        info!(
            "Published zone {} (serial {}) to {} observers",
            report.origin, report.serial, report.subscribers
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(watch_loop(
            self.path.clone(),
            self.debounce,
            Arc::clone(&self.notifier),
            watcher,
            event_rx,
            shutdown_rx,
        ));

        *watch = Some(WatchTask { shutdown_tx, task });
        Ok(())
    }

    async fn stop(&self) {
        let Some(watch) = self.watch.lock().await.take() else {
            return;
        };

        if watch.shutdown_tx.send(()).is_err() {
            debug!("Zone watcher for {} already exited", self.path.display());
        }

        match timeout(Duration::from_secs(5), watch.task).await {
            Ok(Ok(())) => info!("Stopped watching zone file {}", self.path.display()),
            Ok(Err(e)) => error!(
                "Zone watcher task for {} panicked: {}",
                self.path.display(),
                e
            ),
            Err(_) => warn!(
                "Zone watcher for {} did not stop in time",
                self.path.display()
            ),
        }
    }
}

async fn watch_loop(
    path: PathBuf,
    debounce: Duration,
    notifier: Arc<ZoneNotifier>,
    _watcher: RecommendedWatcher,
    mut events: mpsc::UnboundedReceiver<Event>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,
            event = events.recv() => {
                let Some(event) = event else { return };
                if !is_relevant(&event, &path) {
                    continue;
                }
                debug!("Zone file changed: {:?}", event.paths);

                // Wait for the writer to go quiet; other files in the directory don't count
                let mut quiet_at = Instant::now() + debounce;
                loop {
                    tokio::select! {
                        _ = shutdown.recv() => return,
                        next = timeout_at(quiet_at, events.recv()) => match next {
                            Ok(Some(event)) => {
                                if is_relevant(&event, &path) {
                                    quiet_at = Instant::now() + debounce;
                                }
                            }
                            Ok(None) => return,
                            Err(_) => break,
                        },
                    }
                }

                match publish_file(&path, &notifier).await {
                    Ok(report) => info!(
                        "Republished zone {} (serial {}) after {} rounds",
                        report.origin, report.serial, report.rounds
                    ),
                    Err(ProviderError::Notifier(NotifierError::Disposed)) => {
                        info!("Notifier disposed, stopping watch of {}", path.display());
                        return;
                    }
                    Err(e) => error!(
                        "Failed to reload zone file {}, keeping previous zone: {}",
                        path.display(),
                        e
                    ),
                }
            }
        }
    }
}

fn is_relevant(event: &Event, path: &Path) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == path.file_name())
}

fn watch_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

async fn load_zone(path: &Path) -> Result<Zone, ProviderError> {
    let path = path.to_path_buf();
    let zone = tokio::task::spawn_blocking(move || ZoneParser::new().parse_file(&path))
        .await
        .map_err(|e| ZoneError::IoError(format!("zone loader task failed: {}", e)))??;
    Ok(zone)
}

async fn publish_file(
    path: &Path,
    notifier: &ZoneNotifier,
) -> Result<BroadcastReport, ProviderError> {
    let zone = load_zone(path).await?;
    Ok(notifier.notify(zone).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_is_relevant_matches_file_name() {
        let path = Path::new("zones/example.com.zone");

        let modify = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/srv/zones/example.com.zone"));
        assert!(is_relevant(&modify, path));

        let create = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/srv/zones/other.zone"));
        assert!(!is_relevant(&create, path));

        let remove = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/srv/zones/example.com.zone"));
        assert!(!is_relevant(&remove, path));
    }

    #[test]
    fn test_watch_dir() {
        assert_eq!(watch_dir(Path::new("example.zone")), Path::new("."));
        assert_eq!(watch_dir(Path::new("zones/example.zone")), Path::new("zones"));
    }
}
