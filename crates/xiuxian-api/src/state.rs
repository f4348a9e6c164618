//! Shared application state.

use std::sync::Arc;

use xiuxian_session::application::controller::SessionController;
use xiuxian_session::application::illustration::EndingIllustrator;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The single active session.
    pub controller: Arc<SessionController>,
    /// Ending image lookup.
    pub illustrator: Arc<EndingIllustrator>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(controller: Arc<SessionController>, illustrator: Arc<EndingIllustrator>) -> Self {
        Self {
            controller,
            illustrator,
        }
    }
}
