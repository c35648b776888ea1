mod common;

use std::sync::Arc;
use std::time::Duration;

use copytex_watermark::{
    bridge, AlphaMapSlot, BridgeReceiver, Config, DisplaySource, ElementId, ProcessingState,
    ToggleStore, WatermarkService,
};
use tokio::sync::{mpsc, watch};

use common::{settle, watermarked_png, FakeHost, FakeRelay, MemoryAssets, GENERATED_SRC};

const FULL_SIZE: &str = "https://lh3.googleusercontent.com/rd-gg/AbC123=s0";

struct Page {
    service: WatermarkService,
    host: Arc<FakeHost>,
    relay: Arc<FakeRelay>,
    receiver: BridgeReceiver,
}

fn page(config: Config, assets: MemoryAssets) -> Page {
    let host = Arc::new(FakeHost::default());
    let relay = Arc::new(FakeRelay::default());
    relay.serve(FULL_SIZE, watermarked_png(400, 400).1);
    let (sender, receiver) = bridge::channel();
    let service = WatermarkService::new(
        config,
        Arc::new(assets),
        Arc::clone(&relay) as _,
        Arc::clone(&host) as _,
        sender,
    );
    Page {
        service,
        host,
        relay,
        receiver,
    }
}

fn quick_config() -> Config {
    let mut config = Config::default();
    config.bridge.delay_ms = 0;
    config
}

#[tokio::test]
async fn init_scans_and_broadcasts() {
    let Page {
        service,
        host,
        relay,
        receiver,
    } = page(quick_config(), MemoryAssets::with_references());
    host.add(1, GENERATED_SRC, false);

    assert!(!service.is_ready());
    assert!(service.init().await);
    assert!(service.is_ready());
    assert!(service.init().await);

    assert_eq!(relay.calls().len(), 1);
    assert!(matches!(host.displayed(1), Some(DisplaySource::Cleaned(_))));

    let slot = AlphaMapSlot::default();
    receiver.listen(slot.clone()).await;
    let maps = slot.get().unwrap();
    assert_eq!(maps.iter().count(), 2);
}

#[tokio::test]
async fn missing_assets_leave_service_inert() {
    let mut references = MemoryAssets::with_references();
    references.0.remove("bg_96.png");
    let Page {
        service,
        host,
        relay,
        receiver,
    } = page(quick_config(), references);
    host.add(1, GENERATED_SRC, false);

    assert!(!service.init().await);
    assert!(!service.is_ready());
    assert!(service.processor().is_none());

    assert_eq!(service.rescan().await.processed, 0);
    service.enable().await;
    assert_eq!(service.disable(), 0);
    assert!(relay.calls().is_empty());
    assert!(host.displayed(1).is_none());

    // The maps were never sent; disposing drops the pending broadcast.
    service.dispose();
    let slot = AlphaMapSlot::default();
    receiver.listen(slot.clone()).await;
    assert!(!slot.is_ready());
}

#[tokio::test]
async fn disable_restores_and_enable_rescans() {
    let Page {
        service,
        host,
        relay,
        ..
    } = page(quick_config(), MemoryAssets::with_references());
    host.add(1, GENERATED_SRC, false);
    assert!(service.init().await);

    assert_eq!(service.disable(), 1);
    assert!(!service.is_enabled());
    assert_eq!(
        host.displayed(1),
        Some(DisplaySource::Url(GENERATED_SRC.to_string()))
    );

    // Scans are no-ops while disabled.
    assert_eq!(service.rescan().await.processed, 0);

    service.enable().await;
    assert!(service.is_enabled());
    assert_eq!(relay.calls().len(), 2);
    let processor = service.processor().unwrap();
    assert_eq!(processor.state(ElementId(1)), ProcessingState::Done);
}

#[tokio::test]
async fn starting_disabled_skips_scan_and_broadcast() {
    let mut config = quick_config();
    config.toggle.default_enabled = false;
    let Page {
        service,
        host,
        relay,
        receiver,
    } = page(config, MemoryAssets::with_references());
    host.add(1, GENERATED_SRC, false);

    assert!(service.init().await);
    assert!(!service.is_enabled());
    assert!(relay.calls().is_empty());

    service.enable().await;
    assert_eq!(relay.calls().len(), 1);

    service.dispose();
    let slot = AlphaMapSlot::default();
    receiver.listen(slot.clone()).await;
    assert!(!slot.is_ready());
}

#[tokio::test]
async fn toggle_changes_are_applied() {
    let Page {
        service,
        host,
        relay,
        ..
    } = page(quick_config(), MemoryAssets::with_references());
    host.add(1, GENERATED_SRC, false);
    assert!(service.init().await);

    let (tx, rx) = watch::channel(true);
    let driver = async {
        settle().await;
        assert!(service.is_enabled());

        tx.send(false).unwrap();
        settle().await;
        assert!(!service.is_enabled());
        assert_eq!(
            host.displayed(1),
            Some(DisplaySource::Url(GENERATED_SRC.to_string()))
        );

        tx.send(true).unwrap();
        settle().await;
        assert!(service.is_enabled());
        assert_eq!(relay.calls().len(), 2);

        service.dispose();
    };
    tokio::join!(service.watch_toggle(rx), driver);
    assert!(!service.is_enabled());
}

#[tokio::test(start_paused = true)]
async fn observer_debounces_mutation_bursts() {
    let Page {
        service,
        host,
        relay,
        ..
    } = page(quick_config(), MemoryAssets::with_references());
    assert!(service.init().await);
    assert!(relay.calls().is_empty());

    let (tx, rx) = mpsc::channel(16);
    let driver = async {
        host.add(1, GENERATED_SRC, false);
        for _ in 0..3 {
            tx.send(()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // Last mutation at 200ms; the scan is due at 500ms.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(relay.calls().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(relay.calls().len(), 1);

        service.dispose();
    };
    tokio::join!(service.run_observer(rx), driver);
}

#[tokio::test]
async fn observer_stops_when_mutations_close() {
    let Page { service, .. } = page(quick_config(), MemoryAssets::with_references());
    let (tx, rx) = mpsc::channel::<()>(1);
    drop(tx);
    service.run_observer(rx).await;
}

/// Settings storage holding a single key.
struct SingleKeyStore {
    key: &'static str,
    value: watch::Sender<Option<bool>>,
}

impl ToggleStore for SingleKeyStore {
    fn watch(&self, key: &str) -> watch::Receiver<Option<bool>> {
        if key == self.key {
            self.value.subscribe()
        } else {
            watch::channel(None).1
        }
    }
}

#[tokio::test]
async fn follows_configured_storage_key() {
    let mut config = quick_config();
    config.toggle.storage_key = "watermark_toggle".to_string();
    let Page {
        service,
        host,
        relay,
        ..
    } = page(config, MemoryAssets::with_references());
    host.add(1, GENERATED_SRC, false);
    assert!(service.init().await);

    let store = SingleKeyStore {
        key: "watermark_toggle",
        value: watch::Sender::new(Some(false)),
    };
    let driver = async {
        settle().await;
        assert!(!service.is_enabled());
        assert_eq!(
            host.displayed(1),
            Some(DisplaySource::Url(GENERATED_SRC.to_string()))
        );

        // Clearing the key falls back to the configured default.
        store.value.send_replace(None);
        settle().await;
        assert!(service.is_enabled());
        assert_eq!(relay.calls().len(), 2);

        service.dispose();
    };
    tokio::join!(service.follow_toggle(&store), driver);
}

#[tokio::test]
async fn unset_key_uses_default_and_ends_with_the_store() {
    let mut config = quick_config();
    config.toggle.default_enabled = false;
    let Page { service, .. } = page(config, MemoryAssets::with_references());
    assert!(service.init().await);

    let store = SingleKeyStore {
        key: "some_other_setting",
        value: watch::Sender::new(Some(true)),
    };
    service.follow_toggle(&store).await;
    assert!(!service.is_enabled());
}
