//! Shared test doubles for the Xiuxian session engine.

mod clock;
mod generation;
mod image;
mod rng;
mod store;

pub use clock::FixedClock;
pub use generation::{GatedGenerationClient, ScriptedGenerationClient};
pub use image::{FailingImageSearch, StaticImageSearch};
pub use rng::{MockRng, SequenceRng};
pub use store::{FailingSnapshotStore, GatedSnapshotStore, InMemorySnapshotStore};
