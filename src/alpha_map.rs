//! Per-pixel opacity maps for the logo overlay.
//!
//! A reference bitmap is a capture of the logo alone rendered over black,
//! so channel intensity encodes coverage: `alpha = max(R, G, B) / 255`.

use std::sync::Arc;

use image::RgbaImage;

use crate::error::{Error, Result};
use crate::locator::LogoSize;

/// Dense opacity grid, one `f32` in `[0, 1]` per logo pixel, row-major.
///
/// Immutable after construction; share it behind an [`Arc`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl AlphaMap {
    /// Derive an alpha map from a reference bitmap.
    ///
    /// The alpha channel of the reference is ignored.
    #[must_use]
    pub fn build(reference: &RgbaImage) -> Self {
        let values = reference
            .pixels()
            .map(|px| {
                let max_val = px[0].max(px[1]).max(px[2]);
                f32::from(max_val) / 255.0
            })
            .collect();

        Self {
            width: reference.width(),
            height: reference.height(),
            values,
        }
    }

    /// Decode an encoded reference image and build its alpha map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the bytes are not a decodable image.
    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let reference = image::load_from_memory(bytes)
            .map_err(Error::Decode)?
            .to_rgba8();
        Ok(Self::build(&reference))
    }

    /// Rebuild a map from raw values, e.g. after crossing a message boundary.
    ///
    /// Returns `None` when `values.len() != width * height`.
    #[must_use]
    pub fn from_values(width: u32, height: u32, values: Vec<f32>) -> Option<Self> {
        let expected = usize::try_from(u64::from(width) * u64::from(height)).ok()?;
        (values.len() == expected).then_some(Self {
            width,
            height,
            values,
        })
    }

    /// Grid width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Flat row-major values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Alpha at `(col, row)`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, col: u32, row: u32) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.values.get((row * self.width + col) as usize).copied()
    }

    /// The logo tier this map matches, if it is square and of a known size.
    #[must_use]
    pub fn logo_size(&self) -> Option<LogoSize> {
        if self.width != self.height {
            return None;
        }
        LogoSize::from_pixels(self.width)
    }
}

/// Alpha maps keyed by logo tier.
#[derive(Debug, Clone, Default)]
pub struct AlphaMapSet {
    small: Option<Arc<AlphaMap>>,
    large: Option<Arc<AlphaMap>>,
}

impl AlphaMapSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the map for `size`, replacing any previous one.
    pub fn insert(&mut self, size: LogoSize, map: AlphaMap) {
        let slot = match size {
            LogoSize::Small => &mut self.small,
            LogoSize::Large => &mut self.large,
        };
        *slot = Some(Arc::new(map));
    }

    /// Builder-style [`AlphaMapSet::insert`].
    #[must_use]
    pub fn with(mut self, size: LogoSize, map: AlphaMap) -> Self {
        self.insert(size, map);
        self
    }

    /// The map for `size`, if one was loaded.
    #[must_use]
    pub fn get(&self, size: LogoSize) -> Option<&Arc<AlphaMap>> {
        match size {
            LogoSize::Small => self.small.as_ref(),
            LogoSize::Large => self.large.as_ref(),
        }
    }

    /// Iterate over the loaded maps, small first.
    pub fn iter(&self) -> impl Iterator<Item = (LogoSize, &Arc<AlphaMap>)> {
        LogoSize::ALL
            .into_iter()
            .filter_map(|size| self.get(size).map(|map| (size, map)))
    }

    /// Whether no map is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.small.is_none() && self.large.is_none()
    }
}
