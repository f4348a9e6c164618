//! Turn counter.

use serde::{Deserialize, Serialize};

/// Progress through the turn budget.
///
/// `current_turn` only moves forward, one step per player choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    /// Choices made so far.
    pub current_turn: u32,
    /// Turn on which the story must end.
    pub max_turns: u32,
}

impl TurnState {
    /// Turn state for a fresh session.
    #[must_use]
    pub fn new(max_turns: u32) -> Self {
        Self {
            current_turn: 0,
            max_turns,
        }
    }

    /// Advances by one turn and returns the new turn number.
    pub fn advance(&mut self) -> u32 {
        self.current_turn = self.current_turn.saturating_add(1);
        self.current_turn
    }

    /// Whether the current turn has reached the budget.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.current_turn >= self.max_turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_increments_by_one() {
        let mut turns = TurnState::new(3);
        assert_eq!(turns.advance(), 1);
        assert_eq!(turns.advance(), 2);
        assert_eq!(turns.current_turn, 2);
    }

    #[test]
    fn test_final_turn_is_reached_at_budget() {
        let mut turns = TurnState::new(2);
        turns.advance();
        assert!(!turns.is_final());
        turns.advance();
        assert!(turns.is_final());
    }
}
