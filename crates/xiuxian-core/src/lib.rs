//! Xiuxian Core: shared abstractions.
//!
//! This crate defines the traits and types that the session controller and
//! its upstream adapters agree on: the conversation model, the generation,
//! snapshot and image-search ports, the error taxonomy, and the determinism
//! seams (clock, RNG). It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod conversation;
pub mod error;
pub mod generation;
pub mod image;
pub mod rng;
pub mod store;
