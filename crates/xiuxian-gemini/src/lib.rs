//! Gemini REST adapter implementing the `GenerationClient` port.

pub mod client;
mod wire;

pub use client::{BASE_URL, DEFAULT_MODEL, GeminiClient};
