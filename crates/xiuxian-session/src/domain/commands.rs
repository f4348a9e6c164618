//! Commands accepted by the session controller.

use uuid::Uuid;
use xiuxian_core::command::Command;

use super::settings::SessionSettings;

/// Command to begin a new session.
#[derive(Debug, Clone)]
pub struct StartSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Attributes and turn budget.
    pub settings: SessionSettings,
}

impl StartSession {
    /// Creates the command with a fresh correlation ID.
    #[must_use]
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            settings,
        }
    }
}

impl Command for StartSession {
    fn command_type(&self) -> &'static str {
        "session.start"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to submit the player's choice for the current scene.
#[derive(Debug, Clone)]
pub struct SendChoice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Option text as displayed.
    pub choice: String,
}

impl SendChoice {
    /// Creates the command with a fresh correlation ID.
    #[must_use]
    pub fn new(choice: impl Into<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            choice: choice.into(),
        }
    }
}

impl Command for SendChoice {
    fn command_type(&self) -> &'static str {
        "session.send_choice"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to restore the persisted session.
#[derive(Debug, Clone)]
pub struct ContinueSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Default for ContinueSession {
    fn default() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
        }
    }
}

impl Command for ContinueSession {
    fn command_type(&self) -> &'static str {
        "session.continue"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to abandon the session and its snapshot.
#[derive(Debug, Clone)]
pub struct ResetSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Default for ResetSession {
    fn default() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
        }
    }
}

impl Command for ResetSession {
    fn command_type(&self) -> &'static str {
        "session.reset"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
