//! Error types for the copytex-watermark crate.

use crate::locator::LogoSize;

/// Errors that can occur while loading references, fetching, or cleaning images.
///
/// Every variant is contained at per-image granularity by the callers: a
/// failing image keeps showing its original, watermarked pixels.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A bundled reference bitmap could not be loaded or has the wrong shape.
    #[error("failed to load reference asset {name}: {reason}")]
    ReferenceAsset {
        /// Logical asset name (e.g. `bg_48.png`).
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// The privileged fetch relay answered with an error.
    #[error("relay failed: {0}")]
    Relay(String),

    /// The underlying network fetch failed.
    #[error("network error: {0}")]
    Network(String),

    /// Fetched bytes could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// A cleaned buffer could not be re-encoded.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// A relay payload was not a well-formed base64 data URL.
    #[error("malformed data URL: {0}")]
    DataUrl(String),

    /// No alpha map is available for the required logo size.
    #[error("no alpha map for {}x{} logo", .0.pixels(), .0.pixels())]
    MissingAlphaMap(LogoSize),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred while loading or saving an image file.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A cross-context message could not be serialized or parsed.
    #[error("bridge message error: {0}")]
    Bridge(#[from] serde_json::Error),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
