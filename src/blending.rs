//! Alpha blending math for watermark removal.
//!
//! Gemini composites a white logo via source-over blending:
//! `watermarked = alpha * 255 + (1 - alpha) * original`
//!
//! This module provides the reverse operation to recover original pixels.

use image::RgbaImage;

use crate::alpha_map::AlphaMap;
use crate::locator::WatermarkRegion;

/// Alpha threshold: pixels below this are untouched by the overlay.
pub const ALPHA_THRESHOLD: f64 = 0.002;

/// Maximum alpha: the forward formula is singular at 1, so clamp before dividing.
pub const MAX_ALPHA: f64 = 0.99;

/// Logo color value (pure white).
pub const LOGO_VALUE: f64 = 255.0;

/// Decoded RGBA image, mutated in place by [`remove_watermark`].
pub type PixelBuffer = RgbaImage;

/// Remove the overlay from `buffer` inside `region` using reverse alpha blending.
///
/// Applies `original = (watermarked - alpha * 255) / (1 - alpha)` to the
/// three color channels; the alpha channel is left as is. Each alpha is
/// clamped to [`MAX_ALPHA`] before dividing, and pixels whose alpha is
/// below [`ALPHA_THRESHOLD`] are skipped entirely.
///
/// Only bytes inside `region` are written. Parts of the region that fall
/// outside the buffer are skipped, as are cells missing from an undersized
/// `alpha_map`.
pub fn remove_watermark(buffer: &mut PixelBuffer, alpha_map: &AlphaMap, region: &WatermarkRegion) {
    let image_width = i64::from(buffer.width());
    let image_height = i64::from(buffer.height());
    let alphas = alpha_map.values();
    let data: &mut [u8] = buffer;

    for row in 0..region.height {
        let y = region.y + i64::from(row);
        if y < 0 || y >= image_height {
            continue;
        }
        for col in 0..region.width {
            let x = region.x + i64::from(col);
            if x < 0 || x >= image_width {
                continue;
            }

            // Alpha map is indexed by region width, the buffer by image width.
            let alpha_idx = (row * region.width + col) as usize;
            let Some(&stored) = alphas.get(alpha_idx) else {
                continue;
            };
            let mut alpha = f64::from(stored);
            if alpha < ALPHA_THRESHOLD {
                continue;
            }
            alpha = alpha.min(MAX_ALPHA);
            let inv_alpha = 1.0 - alpha;

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let px_idx = ((y * image_width + x) * 4) as usize;
            for ch in 0..3 {
                let watermarked = f64::from(data[px_idx + ch]);
                let original = (watermarked - alpha * LOGO_VALUE) / inv_alpha;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    data[px_idx + ch] = original.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}
