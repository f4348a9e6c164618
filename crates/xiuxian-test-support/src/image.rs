//! Canned `ImageSearch` implementations.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use xiuxian_core::error::ImageLookupError;
use xiuxian_core::image::ImageSearch;

/// Answers known queries with fixed URLs, unknown ones with nothing, and
/// records every query.
#[derive(Debug, Default)]
pub struct StaticImageSearch {
    results: HashMap<String, Vec<String>>,
    queries: Mutex<Vec<(String, u32)>>,
}

impl StaticImageSearch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `query` with `urls`.
    #[must_use]
    pub fn with_results(mut self, query: &str, urls: Vec<String>) -> Self {
        self.results.insert(query.to_owned(), urls);
        self
    }

    /// Every `(query, count)` received, oldest first.
    pub fn queries(&self) -> Vec<(String, u32)> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ImageSearch for StaticImageSearch {
    async fn search(&self, query: &str, count: u32) -> Result<Vec<String>, ImageLookupError> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((query.to_owned(), count));
        let limit = usize::try_from(count).unwrap_or(usize::MAX);
        Ok(self
            .results
            .get(query)
            .map(|urls| urls.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// Fails every lookup with an upstream error.
#[derive(Debug)]
pub struct FailingImageSearch;

#[async_trait]
impl ImageSearch for FailingImageSearch {
    async fn search(&self, _query: &str, _count: u32) -> Result<Vec<String>, ImageLookupError> {
        Err(ImageLookupError::Upstream("status 500".into()))
    }
}
