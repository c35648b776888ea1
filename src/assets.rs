//! Loading of the bundled reference bitmaps.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::alpha_map::{AlphaMap, AlphaMapSet};
use crate::config::AssetConfig;
use crate::error::{Error, Result};
use crate::locator::LogoSize;

/// Source of bundled assets, addressed by logical name.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Return the encoded bytes of asset `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReferenceAsset`] if the asset is unavailable.
    async fn load(&self, name: &str) -> Result<Vec<u8>>;
}

/// Loads assets from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssetLoader {
    root: PathBuf,
}

impl DirAssetLoader {
    /// Serve assets from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetLoader for DirAssetLoader {
    async fn load(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        debug!(path = %path.display(), "loading reference asset");
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::ReferenceAsset {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

async fn load_one(loader: &dyn AssetLoader, name: &str, size: LogoSize) -> Result<AlphaMap> {
    let bytes = loader.load(name).await?;
    let map = AlphaMap::from_png(&bytes).map_err(|e| Error::ReferenceAsset {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    if map.logo_size() != Some(size) {
        return Err(Error::ReferenceAsset {
            name: name.to_string(),
            reason: format!(
                "expected {px}x{px}, got {}x{}",
                map.width(),
                map.height(),
                px = size.pixels()
            ),
        });
    }
    Ok(map)
}

/// Load both reference bitmaps concurrently and build their alpha maps.
///
/// # Errors
///
/// Returns [`Error::ReferenceAsset`] if either reference is missing,
/// undecodable, or not of its tier's exact size.
pub async fn load_alpha_maps(
    loader: &dyn AssetLoader,
    assets: &AssetConfig,
) -> Result<AlphaMapSet> {
    let (small, large) = tokio::try_join!(
        load_one(loader, assets.name_for(LogoSize::Small), LogoSize::Small),
        load_one(loader, assets.name_for(LogoSize::Large), LogoSize::Large),
    )?;
    Ok(AlphaMapSet::new()
        .with(LogoSize::Small, small)
        .with(LogoSize::Large, large))
}
