//! `UnsplashClient` - photo search over the Unsplash REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use xiuxian_core::error::ImageLookupError;
use xiuxian_core::image::ImageSearch;

/// Public API root.
pub const BASE_URL: &str = "https://api.unsplash.com";

/// The API caps `per_page` at 30.
const MAX_PER_PAGE: u32 = 30;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Landscape photo search authenticated with an access key.
#[derive(Clone)]
pub struct UnsplashClient {
    client: Client,
    access_key: String,
    base_url: String,
}

impl std::fmt::Debug for UnsplashClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsplashClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UnsplashClient {
    /// Creates a client for the public API. A blank key is accepted here and
    /// reported as `MissingCredential` on the first search.
    #[must_use]
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            access_key: access_key.into(),
            base_url: BASE_URL.to_owned(),
        }
    }

    /// Points the client at another API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: Option<String>,
}

#[async_trait]
impl ImageSearch for UnsplashClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, count: u32) -> Result<Vec<String>, ImageLookupError> {
        if self.access_key.trim().is_empty() {
            return Err(ImageLookupError::MissingCredential);
        }

        let per_page = count.clamp(1, MAX_PER_PAGE).to_string();
        let response = self
            .client
            .get(format!("{}/search/photos", self.base_url))
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .header("Accept-Version", "v1")
            .query(&[
                ("query", query),
                ("per_page", per_page.as_str()),
                ("orientation", "landscape"),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|err| ImageLookupError::Upstream(format!("Unsplash request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Unsplash returned an error");
            return Err(ImageLookupError::Upstream(format!(
                "status {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let parsed: SearchResponse = response.json().await.map_err(|err| {
            ImageLookupError::Upstream(format!("failed to parse Unsplash response: {err}"))
        })?;
        let urls: Vec<String> = parsed
            .results
            .into_iter()
            .filter_map(|photo| photo.urls.regular)
            .collect();
        debug!(found = urls.len(), "Unsplash search completed");
        Ok(urls)
    }
}
