//! The persisted on/off switch of the feature.

use tokio::sync::watch;

/// Key-value settings storage shared with the extension's options UI.
///
/// A stored value of `None` means the key was never written; readers fall
/// back to [`ToggleConfig::default_enabled`](crate::config::ToggleConfig).
pub trait ToggleStore: Send + Sync {
    /// The current value of `key`, followed by every later write.
    ///
    /// Dropping the sending side ends the subscription.
    fn watch(&self, key: &str) -> watch::Receiver<Option<bool>>;
}
