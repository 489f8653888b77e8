use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use zonecast::{
    FileWatcherZoneProvider, ObserverError, ProviderError, Zone, ZoneNotifier, ZoneObserver,
    ZoneProvider, ZoneStore,
};

fn zone_text(serial: u32, www: &str) -> String {
    format!(
        r#"$ORIGIN example.com.
$TTL 300
@   IN SOA ns1.example.com. admin.example.com. {} 3600 900 604800 86400
@   IN NS  ns1.example.com.
ns1 IN A   192.0.2.53
www IN A   {}
"#,
        serial, www
    )
}

#[derive(Default)]
struct SerialRecorder {
    serials: Mutex<Vec<u32>>,
}

impl SerialRecorder {
    fn serials(&self) -> Vec<u32> {
        self.serials.lock().clone()
    }

    async fn wait_for(&self, serial: u32) -> bool {
        for _ in 0..100 {
            if self.serials.lock().contains(&serial) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }
}

#[async_trait]
impl ZoneObserver for SerialRecorder {
    async fn receive(&self, zone: Arc<Zone>) -> Result<(), ObserverError> {
        self.serials.lock().push(zone.serial);
        Ok(())
    }
}

fn provider_for(path: &Path) -> FileWatcherZoneProvider {
    FileWatcherZoneProvider::new(
        path,
        Duration::from_millis(50),
        Arc::new(ZoneNotifier::default()),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_publishes_current_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("example.com.zone");
    std::fs::write(&path, zone_text(1, "192.0.2.1")).unwrap();

    let provider = provider_for(&path);
    let recorder = Arc::new(SerialRecorder::default());
    let _h = provider.subscribe(recorder.clone()).unwrap();

    provider.start().await.unwrap();
    assert_eq!(recorder.serials(), vec![1]);
    assert!(provider.is_running().await);

    provider.stop().await;
    assert!(!provider.is_running().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_file_change_is_republished() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("example.com.zone");
    std::fs::write(&path, zone_text(1, "192.0.2.1")).unwrap();

    let provider = provider_for(&path);
    let store = Arc::new(ZoneStore::new());
    let recorder = Arc::new(SerialRecorder::default());
    let _hs = provider.subscribe(store.clone()).unwrap();
    let _hr = provider.subscribe(recorder.clone()).unwrap();

    provider.start().await.unwrap();
    std::fs::write(&path, zone_text(2, "192.0.2.99")).unwrap();

    assert!(recorder.wait_for(2).await, "update was not published");
    let zone = store.get_zone("example.com").unwrap();
    assert_eq!(zone.serial, 2);
    assert_eq!(
        zone.get_records("www", None)[0].rdata,
        "192.0.2.99".to_string()
    );

    provider.dispose().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invalid_update_keeps_previous_zone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("example.com.zone");
    std::fs::write(&path, zone_text(1, "192.0.2.1")).unwrap();

    let provider = provider_for(&path);
    let recorder = Arc::new(SerialRecorder::default());
    let _h = provider.subscribe(recorder.clone()).unwrap();
    provider.start().await.unwrap();

    std::fs::write(&path, "this is not a zone file\n").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(recorder.serials(), vec![1]);

    // The watcher survives the bad edit
    std::fs::write(&path, zone_text(3, "192.0.2.3")).unwrap();
    assert!(recorder.wait_for(3).await);

    provider.stop().await;
}

#[tokio::test]
async fn test_start_twice_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("example.com.zone");
    std::fs::write(&path, zone_text(1, "192.0.2.1")).unwrap();

    let provider = provider_for(&path);
    provider.start().await.unwrap();
    assert!(matches!(
        provider.start().await,
        Err(ProviderError::AlreadyStarted)
    ));

    provider.stop().await;
    provider.stop().await;
}

#[tokio::test]
async fn test_start_with_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let provider = provider_for(&dir.path().join("missing.zone"));

    assert!(matches!(
        provider.start().await,
        Err(ProviderError::Zone(_))
    ));
    assert!(!provider.is_running().await);
}

#[tokio::test]
async fn test_dispose_releases_notifier() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("example.com.zone");
    std::fs::write(&path, zone_text(1, "192.0.2.1")).unwrap();

    let provider = provider_for(&path);
    let recorder = Arc::new(SerialRecorder::default());
    let handle = provider.subscribe(recorder.clone()).unwrap();
    provider.start().await.unwrap();

    provider.dispose().await;

    assert!(!provider.is_running().await);
    assert!(provider.notifier().is_disposed());
    assert!(!handle.is_active());
    assert!(matches!(
        provider.reload_now().await,
        Err(ProviderError::Notifier(_))
    ));
    assert!(provider.subscribe(recorder).is_err());
}

#[tokio::test]
async fn test_reload_now_without_watching() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("example.com.zone");
    std::fs::write(&path, zone_text(4, "192.0.2.4")).unwrap();

    let provider = provider_for(&path);
    let recorder = Arc::new(SerialRecorder::default());
    let _h = provider.subscribe(recorder.clone()).unwrap();

    let report = provider.reload_now().await.unwrap();
    assert_eq!(report.origin, "example.com");
    assert_eq!(report.serial, 4);
    assert!(report.completed);
    assert_eq!(recorder.serials(), vec![4]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sibling_writes_do_not_delay_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("example.com.zone");
    let sibling = dir.path().join("example.org.zone");
    std::fs::write(&path, zone_text(1, "192.0.2.1")).unwrap();

    // Long enough that a reload delayed by the sibling writes would miss the window
    let provider = FileWatcherZoneProvider::new(
        &path,
        Duration::from_millis(300),
        Arc::new(ZoneNotifier::default()),
    );
    let recorder = Arc::new(SerialRecorder::default());
    let _h = provider.subscribe(recorder.clone()).unwrap();
    provider.start().await.unwrap();

    std::fs::write(&path, zone_text(2, "192.0.2.2")).unwrap();

    // Keep the directory busy for well past the debounce period
    let busy_writer = {
        let sibling = sibling.clone();
        tokio::spawn(async move {
            for i in 0..40 {
                std::fs::write(&sibling, format!("; edit {}\n", i)).unwrap();
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
    };

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(
        recorder.serials().contains(&2),
        "reload was held back by writes to another file"
    );

    busy_writer.await.unwrap();
    provider.stop().await;
}
