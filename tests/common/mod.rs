#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use copytex_watermark::{
    codec, locate, AlphaMap, AlphaMapSet, AssetLoader, DisplaySource, ElementId, Error, Fetch,
    FetchRelay, FetchRequest, FetchResponse, ImageCandidate, ImageHost, LogoSize, PixelBuffer,
    Result,
};
use image::Rgba;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Highest coverage in the synthetic logo; keeps reverse blending within 1 level.
pub const PEAK_COVERAGE: f64 = 0.45;

pub const GENERATED_SRC: &str = "https://lh3.googleusercontent.com/rd-gg/AbC123=s1024";

/// A soft disc "logo" over black, as a reference capture would look.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn logo_reference(size: u32) -> PixelBuffer {
    let center = f64::from(size) / 2.0;
    PixelBuffer::from_fn(size, size, |x, y| {
        let dx = f64::from(x) + 0.5 - center;
        let dy = f64::from(y) + 0.5 - center;
        let coverage = (1.0 - (dx * dx + dy * dy).sqrt() / center).max(0.0) * PEAK_COVERAGE;
        let v = (coverage * 255.0).round() as u8;
        Rgba([v, v, v, 255])
    })
}

pub fn reference_png(size: u32) -> Vec<u8> {
    codec::encode_png(&logo_reference(size)).unwrap()
}

pub fn alpha_maps() -> AlphaMapSet {
    AlphaMapSet::new()
        .with(LogoSize::Small, AlphaMap::build(&logo_reference(48)))
        .with(LogoSize::Large, AlphaMap::build(&logo_reference(96)))
}

/// A textured background with no overlay.
#[allow(clippy::cast_possible_truncation)]
pub fn background(width: u32, height: u32) -> PixelBuffer {
    PixelBuffer::from_fn(width, height, |x, y| {
        Rgba([
            ((x * 7 + y * 3) % 256) as u8,
            ((x * 2 + y * 5) % 256) as u8,
            ((x + y) % 256) as u8,
            255,
        ])
    })
}

/// Forward-composite the white logo onto `image` at its located region.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn stamp(image: &mut PixelBuffer, maps: &AlphaMapSet) {
    let region = locate(image.width(), image.height());
    let map = maps.get(region.logo_size).unwrap();
    for row in 0..region.height {
        for col in 0..region.width {
            let alpha = f64::from(map.get(col, row).unwrap());
            let px = image.get_pixel_mut(region.x as u32 + col, region.y as u32 + row);
            for ch in 0..3 {
                let blended = alpha * 255.0 + (1.0 - alpha) * f64::from(px[ch]);
                px[ch] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// `(original, watermarked PNG bytes)`.
pub fn watermarked_png(width: u32, height: u32) -> (PixelBuffer, Vec<u8>) {
    let original = background(width, height);
    let mut stamped = original.clone();
    stamp(&mut stamped, &alpha_maps());
    (original, codec::encode_png(&stamped).unwrap())
}

/// Largest per-channel difference between two equally sized buffers.
pub fn max_channel_diff(a: &PixelBuffer, b: &PixelBuffer) -> u8 {
    a.pixels()
        .zip(b.pixels())
        .flat_map(|(pa, pb)| (0..3).map(move |ch| pa[ch].abs_diff(pb[ch])))
        .max()
        .unwrap_or(0)
}

#[derive(Default)]
pub struct FakeHost {
    images: Mutex<Vec<ImageCandidate>>,
    displayed: Mutex<HashMap<ElementId, DisplaySource>>,
}

impl FakeHost {
    pub fn add(&self, id: u64, src: &str, in_generated_container: bool) -> ImageCandidate {
        let candidate = ImageCandidate {
            id: ElementId(id),
            src: src.to_string(),
            in_generated_container,
        };
        self.images.lock().push(candidate.clone());
        candidate
    }

    pub fn displayed(&self, id: u64) -> Option<DisplaySource> {
        self.displayed.lock().get(&ElementId(id)).cloned()
    }

    pub fn cleaned(&self, id: u64) -> Option<PixelBuffer> {
        match self.displayed(id)? {
            DisplaySource::Cleaned(png) => Some(codec::decode(&png).unwrap()),
            DisplaySource::Url(_) => None,
        }
    }
}

impl ImageHost for FakeHost {
    fn images(&self) -> Vec<ImageCandidate> {
        self.images.lock().clone()
    }

    fn set_source(&self, id: ElementId, source: DisplaySource) {
        self.displayed.lock().insert(id, source);
    }
}

/// Relay serving canned images per URL; unknown URLs fail.
#[derive(Default)]
pub struct FakeRelay {
    images: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl FakeRelay {
    /// A relay whose fetches wait for `gate` to be notified.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn serve(&self, url: &str, bytes: Vec<u8>) {
        self.images.lock().insert(url.to_string(), bytes);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl FetchRelay for FakeRelay {
    async fn fetch_as_data_url(&self, url: &str) -> Result<String> {
        self.calls.lock().push(url.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let bytes = self.images.lock().get(url).cloned();
        match bytes {
            Some(bytes) => Ok(codec::to_data_url(&bytes)),
            None => Err(Error::Relay("Fetch failed: 404".to_string())),
        }
    }
}

/// Network stand-in answering per URL; unknown URLs are network errors.
#[derive(Default)]
pub struct FakeFetch {
    routes: Mutex<HashMap<String, FetchResponse>>,
    calls: Mutex<Vec<FetchRequest>>,
}

impl FakeFetch {
    pub fn route(&self, url: &str, status: u16, body: Vec<u8>) -> FetchResponse {
        let response = FetchResponse {
            status,
            status_text: if status == 200 { "OK" } else { "Not Found" }.to_string(),
            headers: vec![
                ("content-type".to_string(), "image/png".to_string()),
                ("x-served-by".to_string(), "fake".to_string()),
            ],
            body: Bytes::from(body),
        };
        self.routes.lock().insert(url.to_string(), response.clone());
        response
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|r| r.url.clone()).collect()
    }
}

#[async_trait]
impl Fetch for FakeFetch {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        self.calls.lock().push(request.clone());
        self.routes
            .lock()
            .get(&request.url)
            .cloned()
            .ok_or_else(|| Error::Network(format!("no route to {}", request.url)))
    }
}

/// Bundled assets held in memory.
#[derive(Default)]
pub struct MemoryAssets(pub HashMap<String, Vec<u8>>);

impl MemoryAssets {
    pub fn with_references() -> Self {
        let mut assets = HashMap::new();
        assets.insert("bg_48.png".to_string(), reference_png(48));
        assets.insert("bg_96.png".to_string(), reference_png(96));
        Self(assets)
    }
}

#[async_trait]
impl AssetLoader for MemoryAssets {
    async fn load(&self, name: &str) -> Result<Vec<u8>> {
        self.0.get(name).cloned().ok_or_else(|| Error::ReferenceAsset {
            name: name.to_string(),
            reason: "not bundled".to_string(),
        })
    }
}

pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
