//! Fixed-offset placement of the logo overlay.
//!
//! Gemini stamps its logo in the bottom-right corner at one of two sizes,
//! chosen purely from the image dimensions.

/// Logo size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogoSize {
    /// 48x48 logo, 32px margin (images where either dimension <= 1024).
    Small,
    /// 96x96 logo, 64px margin (images where both dimensions > 1024).
    Large,
}

impl LogoSize {
    /// Both tiers, small first.
    pub const ALL: [LogoSize; 2] = [LogoSize::Small, LogoSize::Large];

    /// Pick the tier for an image of the given dimensions.
    ///
    /// - **Large**: both width AND height > 1024
    /// - **Small**: otherwise (including 1024x1024 and 2000x800)
    #[must_use]
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        if width > 1024 && height > 1024 {
            LogoSize::Large
        } else {
            LogoSize::Small
        }
    }

    /// Edge length of the square logo in pixels.
    #[must_use]
    pub const fn pixels(self) -> u32 {
        match self {
            LogoSize::Small => 48,
            LogoSize::Large => 96,
        }
    }

    /// Distance from the right and bottom image edges to the logo.
    #[must_use]
    pub const fn margin(self) -> u32 {
        match self {
            LogoSize::Small => 32,
            LogoSize::Large => 64,
        }
    }

    /// Inverse of [`LogoSize::pixels`].
    #[must_use]
    pub const fn from_pixels(pixels: u32) -> Option<Self> {
        match pixels {
            48 => Some(LogoSize::Small),
            96 => Some(LogoSize::Large),
            _ => None,
        }
    }
}

/// Pixel rectangle inside one target image where the overlay is expected.
///
/// `x`/`y` are signed: an image smaller than logo + margin yields a negative
/// origin instead of a wrapped one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkRegion {
    /// Left edge in image pixels.
    pub x: i64,
    /// Top edge in image pixels.
    pub y: i64,
    /// Region width (the logo size).
    pub width: u32,
    /// Region height (the logo size).
    pub height: u32,
    /// Tier the region was derived from.
    pub logo_size: LogoSize,
}

impl WatermarkRegion {
    /// Place a logo of the given tier in an image of `image_width` x `image_height`.
    #[must_use]
    pub fn for_size(image_width: u32, image_height: u32, logo_size: LogoSize) -> Self {
        let logo = i64::from(logo_size.pixels());
        let margin = i64::from(logo_size.margin());
        Self {
            x: i64::from(image_width) - margin - logo,
            y: i64::from(image_height) - margin - logo,
            width: logo_size.pixels(),
            height: logo_size.pixels(),
            logo_size,
        }
    }

    /// Whether the whole region lies inside an image of the given size.
    #[must_use]
    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x + i64::from(self.width) <= i64::from(image_width)
            && self.y + i64::from(self.height) <= i64::from(image_height)
    }
}

/// Locate the overlay region for an image of the given dimensions.
#[must_use]
pub fn locate(width: u32, height: u32) -> WatermarkRegion {
    WatermarkRegion::for_size(width, height, LogoSize::for_dimensions(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_tier_when_either_dim_lte_1024() {
        assert_eq!(LogoSize::for_dimensions(800, 600), LogoSize::Small);
        assert_eq!(LogoSize::for_dimensions(1024, 1024), LogoSize::Small);
        assert_eq!(LogoSize::for_dimensions(2000, 800), LogoSize::Small);
        assert_eq!(LogoSize::for_dimensions(512, 2048), LogoSize::Small);
    }

    #[test]
    fn large_tier_when_both_dims_gt_1024() {
        assert_eq!(LogoSize::for_dimensions(1025, 1025), LogoSize::Large);
        assert_eq!(LogoSize::for_dimensions(2048, 2048), LogoSize::Large);
    }

    #[test]
    fn locate_places_logo_inside_bottom_right_margin() {
        let region = locate(1024, 768);
        assert_eq!(
            region,
            WatermarkRegion {
                x: 1024 - 32 - 48,
                y: 768 - 32 - 48,
                width: 48,
                height: 48,
                logo_size: LogoSize::Small,
            }
        );

        let region = locate(2048, 2048);
        assert_eq!((region.x, region.y), (2048 - 64 - 96, 2048 - 64 - 96));
        assert_eq!(region.width, 96);
        assert!(region.fits_within(2048, 2048));
    }

    #[test]
    fn locate_is_deterministic() {
        assert_eq!(locate(1536, 1152), locate(1536, 1152));
    }

    #[test]
    fn degenerate_images_produce_out_of_bounds_region() {
        let region = locate(50, 50);
        assert!(region.x < 0);
        assert!(!region.fits_within(50, 50));
    }

    #[test]
    fn pixels_round_trip_through_from_pixels() {
        for size in LogoSize::ALL {
            assert_eq!(LogoSize::from_pixels(size.pixels()), Some(size));
        }
        assert_eq!(LogoSize::from_pixels(64), None);
    }
}
