//! Xiuxian: session and turn controller.
//!
//! Owns the conversation with the generation service, enforces the turn
//! budget and forced ending, repairs malformed scenes, persists progress to a
//! single snapshot slot and retries transient upstream failures.

pub mod application;
pub mod domain;
