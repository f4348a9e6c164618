//! Ending illustration lookup.
//!
//! Asks the image index for several candidates and picks one at random, so
//! similar ending keywords do not keep showing the same top-ranked photo.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};
use xiuxian_core::error::ImageLookupError;
use xiuxian_core::image::ImageSearch;
use xiuxian_core::rng::{DeterministicRng, pick_index};

/// Candidates requested per lookup.
pub const CANDIDATE_COUNT: u32 = 10;

/// Query used when the ending keyword finds nothing.
pub const FALLBACK_QUERY: &str = "chinese ink landscape";

/// Picks a display-ready image URL for an ending keyword.
pub struct EndingIllustrator {
    search: Arc<dyn ImageSearch>,
    rng: Mutex<Box<dyn DeterministicRng>>,
}

impl std::fmt::Debug for EndingIllustrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndingIllustrator").finish_non_exhaustive()
    }
}

impl EndingIllustrator {
    /// Creates an illustrator over `search`, picking with `rng`.
    #[must_use]
    pub fn new(search: Arc<dyn ImageSearch>, rng: Box<dyn DeterministicRng>) -> Self {
        Self {
            search,
            rng: Mutex::new(rng),
        }
    }

    /// Looks up `keyword`, falling back to [`FALLBACK_QUERY`] once when the
    /// keyword yields nothing or the lookup fails.
    ///
    /// # Errors
    ///
    /// Returns `ImageLookupError::MissingCredential` immediately, otherwise
    /// the fallback's error, or `NoResults` when both queries come back
    /// empty.
    pub async fn illustrate(&self, keyword: &str) -> Result<String, ImageLookupError> {
        let keyword = keyword.trim();
        let primary = if keyword.is_empty() {
            FALLBACK_QUERY
        } else {
            keyword
        };

        let candidates = match self.search.search(primary, CANDIDATE_COUNT).await {
            Ok(found) if !found.is_empty() => found,
            Err(ImageLookupError::MissingCredential) => {
                return Err(ImageLookupError::MissingCredential);
            }
            outcome if primary != FALLBACK_QUERY => {
                if let Err(err) = &outcome {
                    warn!(query = primary, error = %err, "image lookup failed, trying fallback");
                } else {
                    info!(query = primary, "no image for keyword, trying fallback");
                }
                self.search.search(FALLBACK_QUERY, CANDIDATE_COUNT).await?
            }
            outcome => outcome?,
        };

        let picked = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            pick_index(&mut **rng, candidates.len())
        };
        picked
            .and_then(|index| candidates.into_iter().nth(index))
            .ok_or_else(|| ImageLookupError::NoResults(primary.to_owned()))
    }
}
