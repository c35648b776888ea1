//! URL rules for Gemini image assets.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::ImageCandidate;

/// Substring identifying the image asset host.
pub const IMAGE_HOST: &str = "googleusercontent.com";

/// Size token that requests the native resolution.
pub const NATIVE_SIZE_TOKEN: &str = "=s0";

/// Token prefix that marks user uploads rather than generated images.
const USER_UPLOAD_TOKEN: &str = "0-d?";

static SIZE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=s\d+([-?#]|$)").expect("valid size token regex"));

static GENERATED_REQUEST_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://lh3\.googleusercontent\.com/rd-gg(?:-dl)?/")
        .expect("valid generated image regex")
});

static RENDER_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/rd-gg(?:-dl)?/").expect("valid render path regex"));

/// Rewrite the first `=s<digits>` size token to [`NATIVE_SIZE_TOKEN`].
///
/// The token must be followed by `-`, `?`, `#` or the end of the URL.
/// URLs without a size token are returned unchanged.
#[must_use]
pub fn full_size_url(url: &str) -> String {
    SIZE_TOKEN
        .replace(url, format!("{NATIVE_SIZE_TOKEN}${{1}}").as_str())
        .into_owned()
}

/// Whether an outgoing request targets a generated (not uploaded) image.
///
/// Matches render and download paths on the asset host that carry at least
/// one `=s` token not followed by `0-d?`.
#[must_use]
pub fn is_generated_image_request(url: &str) -> bool {
    let Some(prefix) = GENERATED_REQUEST_PREFIX.find(url) else {
        return false;
    };
    let rest = &url[prefix.end()..];
    rest.match_indices("=s")
        .any(|(i, _)| !rest[i + 2..].starts_with(USER_UPLOAD_TOKEN))
}

/// Whether a document image is a generated image worth cleaning.
#[must_use]
pub fn is_generated_image_element(candidate: &ImageCandidate) -> bool {
    if !candidate.src.contains(IMAGE_HOST) {
        return false;
    }
    candidate.in_generated_container || RENDER_PATH.is_match(&candidate.src)
}
