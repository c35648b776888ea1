//! The fetch capability wrapped by the network interceptor.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute URL.
    pub url: String,
    /// Request headers, in order.
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// A GET request for `url` with no extra headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// The same request pointed at another URL.
    #[must_use]
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: self.headers.clone(),
        }
    }
}

/// A completed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Response headers, in order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Bytes,
}

impl FetchResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The same status line and headers carrying a different body.
    ///
    /// Headers are copied verbatim, so `content-length` and `content-type`
    /// still describe the old body.
    #[must_use]
    pub fn with_body(&self, body: impl Into<Bytes>) -> Self {
        Self {
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            body: body.into(),
        }
    }
}

/// Something that can perform a fetch.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Perform `request`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`](crate::Error::Network) when no response
    /// could be obtained. Non-2xx statuses are responses, not errors.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        (**self).fetch(request).await
    }
}

#[cfg(feature = "http")]
pub use self::http::ReqwestFetch;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;

    use super::{Fetch, FetchRequest, FetchResponse};
    use crate::error::{Error, Result};

    /// [`Fetch`] backed by a `reqwest` client.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestFetch {
        client: reqwest::Client,
    }

    impl ReqwestFetch {
        /// Wrap an existing client.
        #[must_use]
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl Fetch for ReqwestFetch {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
            let mut builder = self.client.get(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            let response = builder
                .send()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;

            let status = response.status();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;

            Ok(FetchResponse {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body,
            })
        }
    }
}
