//! Error taxonomy shared by the controller and its adapters.

use thiserror::Error;

/// Failure reported by a generation-service adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// No access credential is configured.
    #[error("generation credential is not configured")]
    MissingCredential,

    /// The upstream model is overloaded or temporarily unavailable.
    #[error("generation service overloaded: {0}")]
    Overloaded(String),

    /// The upstream rejected the configured credential.
    #[error("generation credential rejected: {0}")]
    InvalidCredential(String),

    /// Any other upstream or transport failure.
    #[error("generation request failed: {0}")]
    Upstream(String),

    /// The upstream answered without any candidate text.
    #[error("generation service returned no text")]
    EmptyResponse,
}

impl GenerationError {
    /// Whether the failure is expected to clear up on its own and is worth
    /// retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Overloaded(_))
    }
}

/// Failure reported by a snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying storage I/O failed.
    #[error("snapshot store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded for storage.
    #[error("snapshot serialization error: {0}")]
    Serialization(String),
}

/// Failure on the optional ending-illustration path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageLookupError {
    /// No image-search credential is configured.
    #[error("image search credential is not configured")]
    MissingCredential,

    /// Neither the keyword nor the fallback query matched any image.
    #[error("no image found for \"{0}\"")]
    NoResults(String),

    /// The image-search service failed.
    #[error("image search failed: {0}")]
    Upstream(String),
}

/// Error surfaced by session controller operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No generation credential is configured.
    #[error("generation credential is not configured")]
    MissingCredential,

    /// The upstream stayed overloaded after every retry.
    #[error("generation service overloaded after retries: {0}")]
    TransientUpstreamOverload(String),

    /// The generation credential was rejected.
    #[error("generation credential rejected: {0}")]
    InvalidCredential(String),

    /// The generation output was not well-formed structured data.
    #[error("malformed generation output: {0}")]
    MalformedOutput(String),

    /// Other non-retryable upstream failure.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// `continue_game` found no snapshot.
    #[error("no saved session")]
    NoSaveData,

    /// The stored snapshot could not be decoded and was discarded.
    #[error("saved session is corrupt: {0}")]
    CorruptSave(String),

    /// The ending illustration could not be found.
    #[error("image lookup failed: {0}")]
    ImageLookupFailure(#[from] ImageLookupError),

    /// An operation is already awaiting the generation service.
    #[error("another operation is in progress")]
    Busy,

    /// A reset or new session replaced the one this operation belonged to.
    #[error("operation superseded by a newer session")]
    Superseded,

    /// The operation is not valid in the controller's current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Rejected input (attribute budget, turn count, empty choice).
    #[error("validation error: {0}")]
    Validation(String),

    /// The snapshot store failed while reading.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl SessionError {
    /// The single user-facing message the controller exposes for this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredential => "The API key has not been configured.".to_owned(),
            Self::TransientUpstreamOverload(_) => {
                "The heavens are crowded right now. Please try again shortly.".to_owned()
            }
            Self::InvalidCredential(_) => {
                "The API key was rejected. Please check it and try again.".to_owned()
            }
            Self::MalformedOutput(_) | Self::Upstream(_) => {
                "The story could not be continued. Please try again.".to_owned()
            }
            Self::NoSaveData => "There is no saved journey to continue.".to_owned(),
            Self::CorruptSave(_) => {
                "The saved journey was damaged and has been discarded.".to_owned()
            }
            other => other.to_string(),
        }
    }
}

impl From<GenerationError> for SessionError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::MissingCredential => Self::MissingCredential,
            GenerationError::Overloaded(message) => Self::TransientUpstreamOverload(message),
            GenerationError::InvalidCredential(message) => Self::InvalidCredential(message),
            GenerationError::Upstream(message) => Self::Upstream(message),
            GenerationError::EmptyResponse => {
                Self::MalformedOutput("empty generation response".to_owned())
            }
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        Self::Persistence(err.to_string())
    }
}
