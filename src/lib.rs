//! Remove the Gemini logo overlay from generated images via reverse alpha blending.
//!
//! Gemini composites a semi-transparent white logo into the bottom-right
//! corner of generated images. Given an alpha map derived from a reference
//! capture of the logo over black, this crate inverts the compositing
//! formula to recover the original pixels. It is applied along two paths:
//!
//! - the **DOM scan** path ([`ImageElementProcessor`]) cleans `<img>`
//!   elements already in the document, fetching their full-resolution bytes
//!   through a privileged [`FetchRelay`];
//! - the **network** path ([`WatermarkInterceptor`]) wraps the page's fetch
//!   and cleans generated-image responses before page code sees them. It
//!   receives its alpha maps through a one-shot [`bridge`].
//!
//! [`WatermarkService`] owns the lifecycle of both and follows the
//! persisted on/off switch in a [`ToggleStore`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use copytex_watermark::{AlphaMap, AlphaMapSet, LogoSize, WatermarkEngine};
//!
//! let bg_48 = std::fs::read("assets/bg_48.png").unwrap();
//! let bg_96 = std::fs::read("assets/bg_96.png").unwrap();
//! let maps = AlphaMapSet::new()
//!     .with(LogoSize::Small, AlphaMap::from_png(&bg_48).unwrap())
//!     .with(LogoSize::Large, AlphaMap::from_png(&bg_96).unwrap());
//!
//! let engine = WatermarkEngine::new(Arc::new(maps));
//! let mut img = image::open("photo.png").unwrap().to_rgba8();
//! engine.clean(&mut img, None).unwrap();
//! img.save("cleaned.png").unwrap();
//! ```

#![deny(missing_docs)]

mod alpha_map;
mod assets;
pub mod blending;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod dom;
mod engine;
pub mod error;
pub mod fetch;
mod interceptor;
pub mod locator;
pub mod logging;
mod processor;
pub mod relay;
mod service;
pub mod toggle;
pub mod urls;

pub use alpha_map::{AlphaMap, AlphaMapSet};
pub use assets::{load_alpha_maps, AssetLoader, DirAssetLoader};
pub use blending::{remove_watermark, PixelBuffer};
pub use bridge::{AlphaMapSlot, AlphaMapTransferPayload, BridgeReceiver, BridgeSender};
pub use config::Config;
pub use dom::{DisplaySource, ElementId, ImageCandidate, ImageHost};
pub use engine::{
    default_output_path, is_supported_image, save_image, ProcessOptions, ProcessResult,
    WatermarkEngine,
};
pub use error::{Error, Result};
pub use fetch::{Fetch, FetchRequest, FetchResponse};
#[cfg(feature = "http")]
pub use fetch::ReqwestFetch;
pub use interceptor::WatermarkInterceptor;
pub use locator::{locate, LogoSize, WatermarkRegion};
pub use processor::{ImageElementProcessor, ProcessingState, ScanSummary};
pub use relay::{BackgroundRelay, FetchRelay, RelayRequest, RelayResponse};
pub use service::WatermarkService;
pub use toggle::ToggleStore;
