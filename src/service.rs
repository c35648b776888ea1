//! Lifecycle of the watermark feature on one page.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alpha_map::AlphaMapSet;
use crate::assets::{load_alpha_maps, AssetLoader};
use crate::bridge::BridgeSender;
use crate::config::Config;
use crate::dom::ImageHost;
use crate::engine::WatermarkEngine;
use crate::processor::{ImageElementProcessor, ScanSummary};
use crate::relay::FetchRelay;
use crate::toggle::ToggleStore;

/// Owns the engine state for one page: readiness, the alpha maps, the
/// enabled flag, and the DOM processor.
///
/// Lifecycle: [`init`](Self::init) once, then [`enable`](Self::enable) /
/// [`disable`](Self::disable) as the toggle changes, and
/// [`dispose`](Self::dispose) when the page goes away. Until `init`
/// succeeds every operation is a no-op.
pub struct WatermarkService {
    config: Config,
    loader: Arc<dyn AssetLoader>,
    relay: Arc<dyn FetchRelay>,
    host: Arc<dyn ImageHost>,
    bridge: Mutex<Option<BridgeSender>>,
    processor: OnceLock<Arc<ImageElementProcessor>>,
    enabled: AtomicBool,
    shutdown: CancellationToken,
}

impl WatermarkService {
    /// Create a service. It starts enabled unless the config says otherwise.
    pub fn new(
        config: Config,
        loader: Arc<dyn AssetLoader>,
        relay: Arc<dyn FetchRelay>,
        host: Arc<dyn ImageHost>,
        bridge: BridgeSender,
    ) -> Self {
        let enabled = config.toggle.default_enabled;
        Self {
            config,
            loader,
            relay,
            host,
            bridge: Mutex::new(Some(bridge)),
            processor: OnceLock::new(),
            enabled: AtomicBool::new(enabled),
            shutdown: CancellationToken::new(),
        }
    }

    /// Load the reference bitmaps and start processing.
    ///
    /// On success, and if the feature is enabled, the alpha maps are
    /// broadcast to the page context after the configured delay while the
    /// first DOM scan runs. A reference load failure is logged and leaves
    /// the service permanently not ready. Returns whether the service is ready.
    pub async fn init(&self) -> bool {
        if self.is_ready() {
            return true;
        }

        let maps = match load_alpha_maps(self.loader.as_ref(), &self.config.assets).await {
            Ok(maps) => Arc::new(maps),
            Err(e) => {
                error!(error = %e, "failed to initialize watermark engine");
                return false;
            }
        };

        let engine = WatermarkEngine::new(Arc::clone(&maps));
        let processor =
            ImageElementProcessor::new(engine, Arc::clone(&self.relay), Arc::clone(&self.host));
        if self.processor.set(Arc::new(processor)).is_err() {
            return true;
        }
        info!("watermark engine initialized");

        if !self.is_enabled() {
            return true;
        }
        tokio::join!(self.broadcast_after_delay(&maps), self.rescan());
        info!("watermark remover ready");
        true
    }

    /// Whether the reference bitmaps were loaded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.processor.get().is_some()
    }

    /// Whether the feature is currently enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// The DOM processor, once ready.
    #[must_use]
    pub fn processor(&self) -> Option<&Arc<ImageElementProcessor>> {
        self.processor.get()
    }

    /// Turn the feature on and resume scanning.
    pub async fn enable(&self) {
        if self.enabled.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("watermark removal enabled");
        self.rescan().await;
    }

    /// Turn the feature off and restore every modified image.
    /// Returns how many images were restored.
    pub fn disable(&self) -> usize {
        self.enabled.store(false, Ordering::SeqCst);
        let restored = self.processor.get().map_or(0, |p| p.restore_all());
        info!(restored, "watermark removal disabled");
        restored
    }

    /// Disable, stop the observer and toggle loops, and drop a pending broadcast.
    pub fn dispose(&self) {
        self.disable();
        self.shutdown.cancel();
        self.bridge.lock().take();
        debug!("watermark service disposed");
    }

    /// Apply a toggle value.
    pub async fn set_enabled(&self, enabled: bool) {
        if enabled {
            self.enable().await;
        } else if self.is_enabled() {
            self.disable();
        }
    }

    /// Run one DOM scan if the service is ready and enabled.
    pub async fn rescan(&self) -> ScanSummary {
        if !self.is_enabled() {
            return ScanSummary::default();
        }
        match self.processor.get() {
            Some(processor) => processor.scan().await,
            None => ScanSummary::default(),
        }
    }

    /// Rescan after DOM mutations, debounced by `scan.debounce_ms`.
    ///
    /// Runs until `mutations` closes or the service is disposed.
    pub async fn run_observer(&self, mut mutations: mpsc::Receiver<()>) {
        let debounce = self.config.scan.debounce();
        debug!(?debounce, "DOM observer active");
        loop {
            let got = tokio::select! {
                () = self.shutdown.cancelled() => return,
                m = mutations.recv() => m.is_some(),
            };
            if !got {
                return;
            }

            // Wait for a quiet period; every new mutation restarts the timer.
            loop {
                let more = tokio::select! {
                    () = self.shutdown.cancelled() => return,
                    () = tokio::time::sleep(debounce) => false,
                    m = mutations.recv() => m.is_some(),
                };
                if !more {
                    break;
                }
            }
            self.rescan().await;
        }
    }

    /// Follow a toggle channel: apply its current value, then every change,
    /// until the sender is dropped or the service is disposed.
    pub async fn watch_toggle(&self, toggle: watch::Receiver<bool>) {
        self.track_toggle(toggle, |enabled| *enabled).await;
    }

    /// Like [`watch_toggle`](Self::watch_toggle), reading `toggle.storage_key`
    /// from `store`. An unset key means `toggle.default_enabled`.
    pub async fn follow_toggle(&self, store: &dyn ToggleStore) {
        let toggle = &self.config.toggle;
        let default_enabled = toggle.default_enabled;
        debug!(key = %toggle.storage_key, "following persisted toggle");
        let receiver = store.watch(&toggle.storage_key);
        self.track_toggle(receiver, move |stored| stored.unwrap_or(default_enabled))
            .await;
    }

    async fn track_toggle<T, F>(&self, mut toggle: watch::Receiver<T>, enabled: F)
    where
        T: Send + Sync,
        F: Fn(&T) -> bool + Send + Sync,
    {
        let initial = enabled(&toggle.borrow_and_update());
        self.set_enabled(initial).await;
        loop {
            let changed = tokio::select! {
                () = self.shutdown.cancelled() => false,
                r = toggle.changed() => r.is_ok(),
            };
            if !changed {
                return;
            }
            let value = enabled(&toggle.borrow_and_update());
            self.set_enabled(value).await;
        }
    }

    async fn broadcast_after_delay(&self, maps: &AlphaMapSet) {
        tokio::time::sleep(self.config.bridge.delay()).await;
        let Some(sender) = self.bridge.lock().take() else {
            return;
        };
        if let Err(e) = sender.broadcast(maps) {
            warn!(error = %e, "failed to send alpha maps to page context");
        }
    }
}
