//! Runtime configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::locator::LogoSize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reference bitmap locations.
    pub assets: AssetConfig,
    /// DOM scan behavior.
    pub scan: ScanConfig,
    /// Alpha map handoff to the page context.
    pub bridge: BridgeConfig,
    /// Feature toggle.
    pub toggle: ToggleConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the file cannot be read and
    /// [`Error::Config`](crate::Error::Config) if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if `content` is not valid TOML.
    pub fn load_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Where the reference bitmaps live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Asset directory.
    pub dir: PathBuf,
    /// 48x48 reference name.
    pub small: String,
    /// 96x96 reference name.
    pub large: String,
}

impl AssetConfig {
    /// Asset name for a logo tier.
    #[must_use]
    pub fn name_for(&self, size: LogoSize) -> &str {
        match size {
            LogoSize::Small => &self.small,
            LogoSize::Large => &self.large,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("assets"),
            small: "bg_48.png".to_string(),
            large: "bg_96.png".to_string(),
        }
    }
}

/// DOM scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Quiet period after the last DOM mutation before rescanning.
    pub debounce_ms: u64,
}

impl ScanConfig {
    /// [`ScanConfig::debounce_ms`] as a [`Duration`].
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

/// Alpha map broadcast settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Delay before broadcasting, giving the page-side listener time to install.
    pub delay_ms: u64,
}

impl BridgeConfig {
    /// [`BridgeConfig::delay_ms`] as a [`Duration`].
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { delay_ms: 200 }
    }
}

/// Persisted feature toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleConfig {
    /// Storage key of the toggle.
    pub storage_key: String,
    /// Value assumed while the key is unset.
    pub default_enabled: bool,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            storage_key: "copytex_watermark_enabled".to_string(),
            default_enabled: true,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
