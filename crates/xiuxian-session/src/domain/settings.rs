//! Session settings chosen on the setup screen.

use serde::{Deserialize, Serialize};
use xiuxian_core::error::SessionError;

/// Talent points a player distributes across the four attributes.
pub const TALENT_POINT_BUDGET: u32 = 10;

/// Talent scores fixed at session start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    /// 根骨: physical aptitude for cultivation.
    pub root_bone: u32,
    /// 悟性: comprehension.
    pub insight: u32,
    /// 氣運: fortune.
    pub luck: u32,
    /// 家世: family standing.
    pub background: u32,
}

impl Attributes {
    /// Sum of all four scores.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.root_bone
            .saturating_add(self.insight)
            .saturating_add(self.luck)
            .saturating_add(self.background)
    }

    /// Points left to distribute against `budget`. Negative when overspent.
    #[must_use]
    pub fn remaining_points(&self, budget: u32) -> i64 {
        i64::from(budget) - i64::from(self.total())
    }
}

/// Story length presets offered to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameLength {
    /// 短篇
    Short,
    /// 中篇
    Medium,
    /// 長篇
    Long,
}

impl GameLength {
    /// Number of player turns this preset allows.
    #[must_use]
    pub fn max_turns(self) -> u32 {
        match self {
            Self::Short => 10,
            Self::Medium => 20,
            Self::Long => 35,
        }
    }
}

/// Settings for one new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Talent scores.
    pub attributes: Attributes,
    /// Turn budget; the story is forced to end on this turn.
    pub max_turns: u32,
}

impl SessionSettings {
    /// Creates settings with an explicit turn budget.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` if `max_turns` is zero.
    pub fn new(attributes: Attributes, max_turns: u32) -> Result<Self, SessionError> {
        if max_turns == 0 {
            return Err(SessionError::Validation(
                "max_turns must be positive".to_owned(),
            ));
        }
        Ok(Self {
            attributes,
            max_turns,
        })
    }

    /// Creates settings from a length preset.
    #[must_use]
    pub fn from_length(attributes: Attributes, length: GameLength) -> Self {
        Self {
            attributes,
            max_turns: length.max_turns(),
        }
    }

    /// Checks that every talent point has been spent and the turn budget is
    /// positive.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` describing the first violation.
    pub fn validate(&self, budget: u32) -> Result<(), SessionError> {
        if self.max_turns == 0 {
            return Err(SessionError::Validation(
                "max_turns must be positive".to_owned(),
            ));
        }
        let remaining = self.attributes.remaining_points(budget);
        if remaining != 0 {
            return Err(SessionError::Validation(format!(
                "attributes must sum to {budget} points ({remaining} remaining)"
            )));
        }
        Ok(())
    }
}
