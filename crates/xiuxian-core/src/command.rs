//! Command abstractions.

use uuid::Uuid;

/// Trait implemented by every controller command.
///
/// Commands carry a correlation ID so a single player action can be followed
/// through the retry loop, the upstream call and the snapshot write in logs.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;
}
