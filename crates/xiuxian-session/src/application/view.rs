//! Read-only view of the controller state.

use serde::Serialize;

use crate::domain::scene::Scene;

/// Controller lifecycle phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No active session.
    #[default]
    Idle,
    /// A generation call is in flight.
    AwaitingGeneration,
    /// A persisted snapshot is being read.
    Restoring,
    /// A valid scene is held; see [`Scene::state`] for ongoing/ended.
    SceneReady,
    /// The last operation failed; cleared by reset, start or continue.
    Error,
}

impl Phase {
    /// Whether an operation is in flight.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::AwaitingGeneration | Self::Restoring)
    }
}

/// Snapshot of everything a presentation layer needs to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionView {
    /// Lifecycle phase.
    pub phase: Phase,
    /// An operation is in flight.
    pub is_loading: bool,
    /// User-facing message of the last failure.
    pub error: Option<String>,
    /// Scene to display.
    pub current_scene: Option<Scene>,
    /// Choices made so far.
    pub current_turn: u32,
    /// Turn budget of the session.
    pub max_turns: u32,
    /// A snapshot is available for `continue_game`.
    pub has_save: bool,
}

impl SessionView {
    /// Whether the held scene is an ending.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.current_scene.as_ref().is_some_and(Scene::is_ended)
    }
}
