//! Postgres-backed counter store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::store::{CounterStore, StoreError};
use crate::db::{self, RateLimitOperations};
use crate::models::RateLimitRecord;

/// Counter store persisted in the `rate_limits` table.
///
/// Atomicity comes from the database: the insert is `ON CONFLICT DO NOTHING`
/// and the increment is a single conditional `UPDATE`.
#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        Ok(RateLimitOperations::get_record(&self.pool, key).await?)
    }

    async fn create_if_absent(&self, key: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let record = RateLimitRecord::first(key, now);
        Ok(RateLimitOperations::create_if_absent(&self.pool, &record).await?)
    }

    async fn compare_and_increment(
        &self,
        expected: &RateLimitRecord,
        next: &RateLimitRecord,
    ) -> Result<bool, StoreError> {
        Ok(RateLimitOperations::compare_and_swap(&self.pool, expected, next).await?)
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(RateLimitOperations::delete_older_than(&self.pool, older_than).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        db::health_check(&self.pool).await?;
        Ok(())
    }
}
