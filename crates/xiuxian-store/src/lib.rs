//! Durable snapshot storage for the Xiuxian session engine.

pub mod file_snapshot_store;
