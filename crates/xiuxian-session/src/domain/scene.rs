//! Scene schema and repair.
//!
//! The generation service is asked for a JSON scene, but what comes back is
//! only trusted to be a JSON object. [`parse_scene`] rejects anything else as
//! malformed and otherwise repairs the object into a scene that satisfies
//! every invariant below. Repairs are deterministic and logged at `warn`.
//!
//! Invariants of a repaired [`Scene`]:
//! - `title` is non-blank and `tags` holds exactly four entries;
//! - an ongoing scene offers one to four options and has no ending keyword;
//! - an ended scene offers no options and has a non-blank ASCII ending
//!   keyword suitable for an image search.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use xiuxian_core::error::SessionError;

/// Tags substituted when the model returns fewer than four.
pub const PLACEHOLDER_TAGS: [&str; 4] = ["迷霧", "虛空", "混沌", "未知"];

/// Title substituted when the model omits one.
pub const PLACEHOLDER_TITLE: &str = "未知之地";

/// Ending keyword substituted when an ended scene lacks a usable one.
pub const FALLBACK_ENDING_KEYWORD: &str = "misty chinese mountains";

/// Number of environment tags on every scene.
pub const TAG_COUNT: usize = 4;

/// Upper bound on options offered per scene.
pub const MAX_OPTIONS: usize = 4;

/// Whether the story continues after this scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneState {
    /// The player picks one of the options.
    Ongoing,
    /// The story is over.
    Ended,
}

/// One structured unit of narrative output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Short location label.
    pub title: String,
    /// Exactly four short environment descriptors.
    pub tags: Vec<String>,
    /// Text-art lines illustrating the scene. Emptied in history entries.
    #[serde(default)]
    pub scene_art: Vec<String>,
    /// Narrative prose.
    pub description: String,
    /// Optional narrator or "system" aside.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Player choices, in display order.
    pub options: Vec<String>,
    /// Whether the story continues.
    pub state: SceneState,
    /// English keyword for the ending illustration; only on ended scenes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_keyword: Option<String>,
}

impl Scene {
    /// Whether the story has ended.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.state == SceneState::Ended
    }

    /// Copy of this scene without its text art, as kept in the conversation
    /// history to bound request size.
    #[must_use]
    pub fn slimmed(&self) -> Self {
        Self {
            scene_art: Vec::new(),
            ..self.clone()
        }
    }

    /// JSON text of the slimmed scene, used as the model's history entry.
    ///
    /// # Panics
    ///
    /// Never in practice: every field is a string, a list of strings or a
    /// unit enum, which `serde_json` always serializes.
    #[must_use]
    pub fn history_text(&self) -> String {
        serde_json::to_string(&self.slimmed()).expect("Scene serialization is infallible")
    }

    /// Checks every scene invariant.
    #[must_use]
    pub fn is_schema_valid(&self) -> bool {
        if self.title.trim().is_empty() || self.tags.len() != TAG_COUNT {
            return false;
        }
        match self.state {
            SceneState::Ongoing => {
                (1..=MAX_OPTIONS).contains(&self.options.len()) && self.ending_keyword.is_none()
            }
            SceneState::Ended => {
                self.options.is_empty()
                    && self
                        .ending_keyword
                        .as_deref()
                        .is_some_and(is_usable_keyword)
            }
        }
    }
}

/// Turn context that influences repair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairContext {
    /// The turn budget is spent; the scene must end regardless of what the
    /// model said.
    pub force_ending: bool,
}

/// Parses raw generation output and repairs it into a valid [`Scene`].
///
/// # Errors
///
/// Returns `SessionError::MalformedOutput` if `raw` is not a JSON object.
pub fn parse_scene(raw: &str, context: RepairContext) -> Result<Scene, SessionError> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SessionError::MalformedOutput(format!("invalid JSON: {e}")))?;
    let Value::Object(object) = value else {
        return Err(SessionError::MalformedOutput(
            "expected a JSON object".to_owned(),
        ));
    };
    Ok(repair(&object, context))
}

fn repair(object: &Map<String, Value>, context: RepairContext) -> Scene {
    let title = match string_field(object, &["title"]) {
        Some(title) => title,
        None => {
            warn!("scene title missing, substituting placeholder");
            PLACEHOLDER_TITLE.to_owned()
        }
    };

    let mut tags = string_list(object, &["tags"]).unwrap_or_default();
    if tags.len() < TAG_COUNT {
        warn!(found = tags.len(), "scene tags incomplete, substituting placeholders");
        tags = PLACEHOLDER_TAGS.iter().map(|&tag| tag.to_owned()).collect();
    } else if tags.len() > TAG_COUNT {
        warn!(found = tags.len(), "scene has extra tags, truncating");
        tags.truncate(TAG_COUNT);
    }

    let scene_art = raw_lines(object, "scene_art");
    let description =
        string_field(object, &["description", "scene_description"]).unwrap_or_default();
    let system_message = string_field(object, &["system_message"]);

    let mut options = string_list(object, &["options"]).unwrap_or_default();
    if options.len() > MAX_OPTIONS {
        warn!(found = options.len(), "scene has too many options, truncating");
        options.truncate(MAX_OPTIONS);
    }

    let mut state = match string_field(object, &["state", "game_state"]) {
        Some(state) if state.eq_ignore_ascii_case("ended") => SceneState::Ended,
        Some(state) if state.eq_ignore_ascii_case("ongoing") => SceneState::Ongoing,
        other => {
            warn!(state = ?other, "scene state missing or unknown, reading as ongoing");
            SceneState::Ongoing
        }
    };

    if context.force_ending && state == SceneState::Ongoing {
        warn!("turn budget spent but scene is ongoing, forcing ending");
        state = SceneState::Ended;
    }
    if state == SceneState::Ongoing && options.is_empty() {
        warn!("ongoing scene offers no options, treating as ended");
        state = SceneState::Ended;
    }

    let ending_keyword = match state {
        SceneState::Ongoing => None,
        SceneState::Ended => {
            if !options.is_empty() {
                warn!(found = options.len(), "ended scene carries options, clearing");
                options.clear();
            }
            match string_field(object, &["ending_keyword"]) {
                Some(keyword) if is_usable_keyword(&keyword) => Some(keyword),
                other => {
                    warn!(keyword = ?other, "ending keyword unusable, substituting fallback");
                    Some(FALLBACK_ENDING_KEYWORD.to_owned())
                }
            }
        }
    };

    Scene {
        title,
        tags,
        scene_art,
        description,
        system_message,
        options,
        state,
        ending_keyword,
    }
}

fn is_usable_keyword(keyword: &str) -> bool {
    !keyword.trim().is_empty() && keyword.is_ascii()
}

/// First non-blank string value among `keys`, trimmed.
fn string_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_owned)
}

/// First array value among `keys`, keeping its non-blank string entries.
fn string_list(object: &Map<String, Value>, keys: &[&str]) -> Option<Vec<String>> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_owned)
                .collect()
        })
}

/// Art lines keep their spacing; alignment matters for monospace rendering.
fn raw_lines(object: &Map<String, Value>, key: &str) -> Vec<String> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Strips one surrounding Markdown code fence, with or without a language
/// tag.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    match inner.split_once('\n') {
        Some((tag, body)) if !tag.contains('{') => body.trim(),
        _ => inner.trim(),
    }
}
