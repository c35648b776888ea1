//! Cross-origin fetch relay.
//!
//! The DOM scan path cannot read cross-origin image bytes itself, so it asks
//! a privileged context to fetch them and hand them back as a data URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchRequest};

/// Request sent to the privileged context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayRequest {
    /// Fetch `url` and return it as a data URL.
    #[serde(rename = "fetchImageAsDataUrl")]
    FetchImageAsDataUrl {
        /// Absolute URL to fetch.
        url: String,
    },
}

/// Answer from the privileged context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayResponse {
    /// The fetched bytes as a data URL.
    DataUrl {
        /// `data:<mime>;base64,...`
        #[serde(rename = "dataUrl")]
        data_url: String,
    },
    /// The fetch failed.
    Error {
        /// Failure description.
        error: String,
    },
}

impl RelayResponse {
    /// Convert into the data URL or a [`Error::Relay`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Relay`] carrying the error description.
    pub fn into_result(self) -> Result<String> {
        match self {
            RelayResponse::DataUrl { data_url } => Ok(data_url),
            RelayResponse::Error { error } => Err(Error::Relay(error)),
        }
    }
}

/// Fetches image bytes on behalf of a less privileged context.
#[async_trait]
pub trait FetchRelay: Send + Sync {
    /// Fetch `url` and return its bytes as a data URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Relay`] or [`Error::Network`] on failure.
    async fn fetch_as_data_url(&self, url: &str) -> Result<String>;
}

/// The privileged end of the relay, performing real fetches.
#[derive(Debug, Clone)]
pub struct BackgroundRelay<F> {
    fetcher: F,
}

impl<F: Fetch> BackgroundRelay<F> {
    /// Relay through `fetcher`.
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Answer one wire request. Never fails: errors become [`RelayResponse::Error`].
    pub async fn handle(&self, request: RelayRequest) -> RelayResponse {
        let RelayRequest::FetchImageAsDataUrl { url } = request;
        match self.fetch_as_data_url(&url).await {
            Ok(data_url) => RelayResponse::DataUrl { data_url },
            Err(e) => RelayResponse::Error {
                error: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl<F: Fetch> FetchRelay for BackgroundRelay<F> {
    async fn fetch_as_data_url(&self, url: &str) -> Result<String> {
        let response = self.fetcher.fetch(FetchRequest::get(url)).await?;
        if !response.is_ok() {
            return Err(Error::Relay(format!("Fetch failed: {}", response.status)));
        }
        debug!(bytes = response.body.len(), "relayed image");
        Ok(codec::to_data_url(&response.body))
    }
}
