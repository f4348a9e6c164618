//! Generation service port.

use async_trait::async_trait;

use crate::conversation::ConversationTurn;
use crate::error::GenerationError;

/// One call to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Prior exchange, oldest first.
    pub history: Vec<ConversationTurn>,
    /// The new user turn.
    pub turn: ConversationTurn,
    /// Output format and narrative rules. Only sent on the first call of a
    /// session.
    pub system_instruction: Option<String>,
}

/// Adapter that sends a conversation to the generation service and returns
/// the raw structured text it produced.
///
/// Implementations enforce the service's JSON output mode; parsing and
/// repair of the text belong to the caller.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate the next scene for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
