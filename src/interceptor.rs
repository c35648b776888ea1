//! Fetch middleware that cleans generated images before page code sees them.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::bridge::{AlphaMapSlot, BridgeReceiver};
use crate::engine::WatermarkEngine;
use crate::error::Result;
use crate::fetch::{Fetch, FetchRequest, FetchResponse};
use crate::urls;

/// Wraps a [`Fetch`] and cleans responses for generated-image URLs.
///
/// Until the alpha maps arrive, and for every non-matching URL, requests go
/// straight to the inner fetch and its result (errors included) is returned
/// untouched. Cleaning is best-effort: any failure while decoding or
/// re-encoding re-issues the original request instead.
///
/// A cleaned response keeps the upstream status and headers. The body is
/// always PNG, so an upstream `content-type` of another format and any
/// `content-length` are stale; consumers should read the body's own length.
#[derive(Debug, Clone)]
pub struct WatermarkInterceptor<F> {
    inner: F,
    slot: AlphaMapSlot,
}

impl<F: Fetch> WatermarkInterceptor<F> {
    /// Wrap `inner`, reading alpha maps from `slot`.
    pub fn new(inner: F, slot: AlphaMapSlot) -> Self {
        Self { inner, slot }
    }

    /// Wrap `inner` and start listening on `receiver` for the alpha maps.
    ///
    /// Must be called within a tokio runtime.
    pub fn install(inner: F, receiver: BridgeReceiver) -> Self {
        Self::new(inner, receiver.spawn())
    }

    /// Whether the alpha maps have arrived.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }
}

#[async_trait]
impl<F: Fetch> Fetch for WatermarkInterceptor<F> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let Some(maps) = self.slot.get() else {
            return self.inner.fetch(request).await;
        };
        if !urls::is_generated_image_request(&request.url) {
            return self.inner.fetch(request).await;
        }

        debug!(url = %request.url, "intercepting generated image fetch");
        let full_size = request.with_url(urls::full_size_url(&request.url));
        let response = self.inner.fetch(full_size).await?;
        if !response.is_ok() {
            return Ok(response);
        }

        match WatermarkEngine::new(maps).clean_encoded(&response.body) {
            Ok(png) => {
                debug!(url = %request.url, "watermark removed from fetched image");
                Ok(response.with_body(png))
            }
            Err(e) => {
                warn!(
                    url = %request.url,
                    error = %e,
                    "fetch processing failed, re-issuing original request"
                );
                self.inner.fetch(request).await
            }
        }
    }
}
