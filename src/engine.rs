//! Shared watermark removal core.
//!
//! The DOM scan path, the network interceptor and the CLI all clean images
//! through one [`WatermarkEngine`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::alpha_map::AlphaMapSet;
use crate::blending::{self, PixelBuffer};
use crate::codec;
use crate::error::{Error, Result};
use crate::locator::{LogoSize, WatermarkRegion};

/// Options controlling batch file processing.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Force a specific logo size instead of picking it from the dimensions.
    pub force_size: Option<LogoSize>,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the file was skipped (too small to carry the overlay).
    pub skipped: bool,
    /// Human-readable status message.
    pub message: String,
}

/// Watermark engine holding the alpha maps.
///
/// Cheap to clone; the maps are shared read-only.
#[derive(Debug, Clone)]
pub struct WatermarkEngine {
    maps: Arc<AlphaMapSet>,
}

impl WatermarkEngine {
    /// Create an engine over already-built alpha maps.
    #[must_use]
    pub fn new(maps: Arc<AlphaMapSet>) -> Self {
        Self { maps }
    }

    /// Remove the overlay from a decoded buffer in place.
    ///
    /// The region is derived from the buffer dimensions unless `force_size`
    /// overrides the tier. Returns the region that was cleaned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAlphaMap`] if no map is loaded for the tier.
    pub fn clean(
        &self,
        buffer: &mut PixelBuffer,
        force_size: Option<LogoSize>,
    ) -> Result<WatermarkRegion> {
        let (width, height) = buffer.dimensions();
        let size = force_size.unwrap_or_else(|| LogoSize::for_dimensions(width, height));
        let region = WatermarkRegion::for_size(width, height, size);
        let alpha_map = self.maps.get(size).ok_or(Error::MissingAlphaMap(size))?;

        blending::remove_watermark(buffer, alpha_map, &region);
        debug!(
            width,
            height,
            x = region.x,
            y = region.y,
            logo = size.pixels(),
            "removed watermark"
        );
        Ok(region)
    }

    /// Decode encoded bytes, clean them, and re-encode as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`], [`Error::MissingAlphaMap`] or [`Error::Encode`].
    pub fn clean_encoded(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut buffer = codec::decode(bytes)?;
        self.clean(&mut buffer, None)?;
        codec::encode_png(&buffer)
    }

    /// Process a single image file: load, remove, save.
    ///
    /// Returns a [`ProcessResult`] indicating success, skip, or failure.
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            skipped: false,
            message: String::new(),
        };

        let mut buffer = match image::open(input) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };
        let (w, h) = buffer.dimensions();

        let size = opts
            .force_size
            .unwrap_or_else(|| LogoSize::for_dimensions(w, h));
        if !WatermarkRegion::for_size(w, h, size).fits_within(w, h) {
            result.skipped = true;
            result.success = true;
            result.message = format!(
                "Image too small ({w}x{h}) for {px}x{px} watermark",
                px = size.pixels()
            );
            return result;
        }

        if let Err(e) = self.clean(&mut buffer, Some(size)) {
            result.message = e.to_string();
            return result;
        }

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match save_image(&buffer, output) {
            Ok(()) => {
                result.success = true;
                result.message = "Watermark removed".to_string();
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Process all supported images in a directory.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// Returns a [`ProcessResult`] for each image found.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult {
                    path: input_dir.to_path_buf(),
                    success: false,
                    skipped: false,
                    message: format!("Failed to read directory: {e}"),
                }];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult {
                    path: output_dir.to_path_buf(),
                    success: false,
                    skipped: false,
                    message: format!("Failed to create output directory: {e}"),
                }];
            }
        }

        let run = |input_path: &PathBuf| {
            let output_path = match input_path.file_name() {
                Some(name) => output_dir.join(name),
                None => output_dir.join(default_output_path(input_path)),
            };
            self.process_file(input_path, &output_path, opts)
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(run).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            entries.iter().map(run).collect()
        }
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save a cleaned buffer with format-specific settings.
///
/// JPEG and BMP drop the alpha channel; JPEG is written at quality 100.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    let dyn_img = DynamicImage::ImageRgba8(buffer.clone());

    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&DynamicImage::ImageRgb8(dyn_img.to_rgb8()))?;
        }
        ImageFormat::Bmp => {
            DynamicImage::ImageRgb8(dyn_img.to_rgb8()).save(path)?;
        }
        ImageFormat::Png | ImageFormat::WebP => {
            dyn_img.save(path)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_cleaned.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_cleaned.{ext}"))
}
