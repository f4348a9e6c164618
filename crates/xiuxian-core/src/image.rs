//! Image search port.

use async_trait::async_trait;

use crate::error::ImageLookupError;

/// Raw lookup against an external image-search index.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Returns up to `count` display-ready image URLs matching `query`.
    /// An empty vector means the index had no match.
    async fn search(&self, query: &str, count: u32) -> Result<Vec<String>, ImageLookupError>;
}
