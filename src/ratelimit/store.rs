//! Counter store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::RateLimitRecord;

/// Failures raised by a counter store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database errors from the persistent store
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Conditional writes kept losing to concurrent requests
    #[error("Contention on key {key}: gave up after {attempts} conditional writes")]
    Contention { key: String, attempts: u32 },
}

/// Shared per-key counter storage.
///
/// Implementations provide the concurrency guarantee: `create_if_absent` and
/// `compare_and_increment` must each be atomic with respect to every other
/// operation on the same key. The limiter never locks anything itself.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Load the record for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError>;

    /// Create `{key, attempts: 1, updated_at: now}` unless a record exists.
    ///
    /// Returns `true` if this call created the record.
    async fn create_if_absent(&self, key: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Replace the stored record with `next` only if it still equals `expected`.
    ///
    /// Returns `false` when another writer got there first.
    async fn compare_and_increment(
        &self,
        expected: &RateLimitRecord,
        next: &RateLimitRecord,
    ) -> Result<bool, StoreError>;

    /// Delete records last written before `older_than`; returns how many.
    async fn prune(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Cheap liveness check.
    async fn ping(&self) -> Result<(), StoreError>;
}
