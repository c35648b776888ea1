//! The document as seen by the DOM scan path.
//!
//! The host owns element discovery and mutation observation; the processor
//! only reads candidates and swaps what an element displays.

use bytes::Bytes;

/// Stable identity of one `<img>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// An image element the host found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    /// Element identity.
    pub id: ElementId,
    /// Current `src` attribute.
    pub src: String,
    /// Whether the element sits inside a generated-image container.
    pub in_generated_container: bool,
}

/// What an element should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplaySource {
    /// A URL, used to put the original source back.
    Url(String),
    /// Cleaned PNG bytes; the host turns these into a displayable resource.
    Cleaned(Bytes),
}

/// Document access required by [`ImageElementProcessor`](crate::ImageElementProcessor).
pub trait ImageHost: Send + Sync {
    /// All image elements whose source points at the image asset host.
    fn images(&self) -> Vec<ImageCandidate>;

    /// Swap what element `id` displays. Unknown ids are ignored.
    fn set_source(&self, id: ElementId, source: DisplaySource);
}
