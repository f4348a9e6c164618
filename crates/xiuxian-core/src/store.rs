//! Snapshot store port.

use async_trait::async_trait;

use crate::error::StoreError;

/// Durable key-value storage for serialized session snapshots.
///
/// The controller is the only writer; `set` overwrites and `remove` of a
/// missing key succeeds.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes the value stored under `key`.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
