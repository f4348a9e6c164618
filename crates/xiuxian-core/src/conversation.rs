//! Conversation history exchanged with the generation service.

use serde::{Deserialize, Serialize};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The player side: opening prompt and choices.
    User,
    /// The generation service.
    Model,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One entry of the append-only conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who produced this turn.
    pub role: Role,
    /// Opaque text content.
    pub text: String,
}

impl ConversationTurn {
    /// Creates a user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Creates a model turn.
    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Returns `true` when `history` alternates user→model starting with user.
#[must_use]
pub fn is_well_formed(history: &[ConversationTurn]) -> bool {
    history.iter().enumerate().all(|(index, turn)| {
        let expected = if index % 2 == 0 {
            Role::User
        } else {
            Role::Model
        };
        turn.role == expected
    })
}
