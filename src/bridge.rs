//! One-shot handoff of alpha maps to the page execution context.
//!
//! The privileged context can load bundled references; the page context is
//! the one that sees the page's fetches. They share no memory, so the maps
//! cross as a single serialized message of plain numeric arrays. The
//! receiver fills an [`AlphaMapSlot`]; until then (or forever, if the
//! message never arrives) the interceptor passes every request through.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::alpha_map::{AlphaMap, AlphaMapSet};
use crate::error::Result;
use crate::locator::LogoSize;

/// Message type tag of the alpha map broadcast.
pub const MESSAGE_TYPE: &str = "COPYTEX_WATERMARK_ALPHA_MAPS";

/// Wire form of the alpha map broadcast.
///
/// ```json
/// {"type": "COPYTEX_WATERMARK_ALPHA_MAPS", "maps": {"48": [0.0, ...], "96": [...]}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaMapTransferPayload {
    /// Always [`MESSAGE_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Flat alpha values keyed by logo edge length.
    pub maps: BTreeMap<String, Vec<f32>>,
}

impl AlphaMapTransferPayload {
    /// Serialize every map in `maps`.
    #[must_use]
    pub fn from_maps(maps: &AlphaMapSet) -> Self {
        let maps = maps
            .iter()
            .map(|(size, map)| (size.pixels().to_string(), map.values().to_vec()))
            .collect();
        Self {
            kind: MESSAGE_TYPE.to_string(),
            maps,
        }
    }

    /// Reconstruct the maps, dropping entries with an unknown size or the
    /// wrong number of values.
    #[must_use]
    pub fn into_maps(self) -> AlphaMapSet {
        let mut set = AlphaMapSet::new();
        for (key, values) in self.maps {
            let Some(size) = key.parse().ok().and_then(LogoSize::from_pixels) else {
                warn!(key = %key, "ignoring alpha map with unknown size");
                continue;
            };
            let px = size.pixels();
            match AlphaMap::from_values(px, px, values) {
                Some(map) => set.insert(size, map),
                None => warn!(key = %key, "ignoring alpha map with wrong length"),
            }
        }
        set
    }
}

/// Create a connected sender/receiver pair.
#[must_use]
pub fn channel() -> (BridgeSender, BridgeReceiver) {
    let (tx, rx) = oneshot::channel();
    (BridgeSender { tx }, BridgeReceiver { rx })
}

/// Privileged end of the bridge. Sends exactly once.
#[derive(Debug)]
pub struct BridgeSender {
    tx: oneshot::Sender<String>,
}

impl BridgeSender {
    /// Broadcast `maps`. A receiver that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bridge`](crate::Error::Bridge) if serialization fails.
    pub fn broadcast(self, maps: &AlphaMapSet) -> Result<()> {
        let message = serde_json::to_string(&AlphaMapTransferPayload::from_maps(maps))?;
        if self.tx.send(message).is_err() {
            debug!("alpha map receiver gone, broadcast dropped");
        } else {
            info!("sent alpha maps to page context");
        }
        Ok(())
    }
}

/// Page end of the bridge.
#[derive(Debug)]
pub struct BridgeReceiver {
    rx: oneshot::Receiver<String>,
}

impl BridgeReceiver {
    /// Wait for the broadcast and fill `slot`.
    ///
    /// A dropped sender, an unparseable message, or one without any valid
    /// map leaves `slot` empty.
    pub async fn listen(self, slot: AlphaMapSlot) {
        let Ok(message) = self.rx.await else {
            warn!("alpha maps never arrived, interceptor stays pass-through");
            return;
        };

        let payload: AlphaMapTransferPayload = match serde_json::from_str(&message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "unparseable alpha map message");
                return;
            }
        };
        if payload.kind != MESSAGE_TYPE {
            debug!(kind = %payload.kind, "ignoring unrelated message");
            return;
        }

        let maps = payload.into_maps();
        if maps.is_empty() {
            warn!("alpha map message carried no usable maps");
            return;
        }
        let sizes: Vec<u32> = maps.iter().map(|(size, _)| size.pixels()).collect();
        if slot.fill(maps) {
            info!(?sizes, "page context ready with alpha maps");
        }
    }

    /// Run [`BridgeReceiver::listen`] on the tokio runtime and return the slot.
    #[must_use]
    pub fn spawn(self) -> AlphaMapSlot {
        let slot = AlphaMapSlot::default();
        tokio::spawn(self.listen(slot.clone()));
        slot
    }
}

/// Where the page context keeps the received maps. Empty means not ready.
#[derive(Debug, Clone, Default)]
pub struct AlphaMapSlot(Arc<OnceLock<Arc<AlphaMapSet>>>);

impl AlphaMapSlot {
    /// The maps, once they have arrived.
    #[must_use]
    pub fn get(&self) -> Option<Arc<AlphaMapSet>> {
        self.0.get().cloned()
    }

    /// Whether the maps have arrived.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.0.get().is_some()
    }

    /// Store the maps. Only the first call has an effect; returns whether it did.
    pub fn fill(&self, maps: AlphaMapSet) -> bool {
        self.0.set(Arc::new(maps)).is_ok()
    }
}
