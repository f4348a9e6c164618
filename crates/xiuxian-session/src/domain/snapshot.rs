//! Persisted form of an in-progress session.
//!
//! The snapshot is wrapped in a versioned envelope carrying a SHA-256
//! checksum of its JSON payload. Anything that fails to decode, verify or
//! validate is reported as a corrupt save.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use xiuxian_core::conversation::{ConversationTurn, is_well_formed};
use xiuxian_core::error::{SessionError, StoreError};

use super::scene::Scene;
use super::turn::TurnState;

/// The single logical key the snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "xiuxian.session.snapshot";

/// Current envelope format.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Durable record of an ongoing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Scene the player is looking at.
    pub current_scene: Scene,
    /// Full exchange; model entries are slimmed.
    pub conversation_history: Vec<ConversationTurn>,
    /// Turn progress.
    pub turn_state: TurnState,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    format_version: u32,
    checksum: String,
    payload: String,
}

fn checksum(payload: &str) -> String {
    format!("{:x}", Sha256::digest(payload.as_bytes()))
}

impl SessionSnapshot {
    /// Serializes the snapshot into its stored envelope.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if JSON encoding fails.
    pub fn encode(&self) -> Result<String, StoreError> {
        let payload =
            serde_json::to_string(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let envelope = SnapshotEnvelope {
            format_version: SNAPSHOT_FORMAT_VERSION,
            checksum: checksum(&payload),
            payload,
        };
        serde_json::to_string(&envelope).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decodes and validates a stored envelope.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::CorruptSave` if the envelope cannot be parsed,
    /// has an unknown version, fails its checksum, or holds a snapshot that
    /// breaks a session invariant.
    pub fn decode(raw: &str) -> Result<Self, SessionError> {
        let envelope: SnapshotEnvelope = serde_json::from_str(raw)
            .map_err(|e| SessionError::CorruptSave(format!("unreadable envelope: {e}")))?;
        if envelope.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SessionError::CorruptSave(format!(
                "unsupported format version {}",
                envelope.format_version
            )));
        }
        if checksum(&envelope.payload) != envelope.checksum {
            return Err(SessionError::CorruptSave("checksum mismatch".to_owned()));
        }
        let snapshot: Self = serde_json::from_str(&envelope.payload)
            .map_err(|e| SessionError::CorruptSave(format!("unreadable snapshot: {e}")))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.turn_state.max_turns == 0 {
            return Err(SessionError::CorruptSave("max_turns is zero".to_owned()));
        }
        if self.current_scene.is_ended() || !self.current_scene.is_schema_valid() {
            return Err(SessionError::CorruptSave(
                "stored scene is not a valid ongoing scene".to_owned(),
            ));
        }
        // A saved session always holds at least one user/model pair.
        let history = &self.conversation_history;
        if history.is_empty() || history.len() % 2 != 0 || !is_well_formed(history) {
            return Err(SessionError::CorruptSave(
                "conversation history does not alternate user/model".to_owned(),
            ));
        }
        Ok(())
    }
}
