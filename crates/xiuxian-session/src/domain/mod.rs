//! Domain types for a play-through.

pub mod commands;
pub mod prompts;
pub mod scene;
pub mod settings;
pub mod snapshot;
pub mod turn;
