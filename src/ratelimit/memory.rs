//! In-process counter store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::store::{CounterStore, StoreError};
use crate::models::RateLimitRecord;

/// Counter store backed by a mutex-guarded map.
///
/// Suitable for a single instance; records are lost on restart.
#[derive(Default)]
pub struct MemoryCounterStore {
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a record directly.
    pub async fn insert(&self, record: RateLimitRecord) {
        self.records.lock().await.insert(record.key.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn create_if_absent(&self, key: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(key) {
            return Ok(false);
        }
        records.insert(key.to_string(), RateLimitRecord::first(key, now));
        Ok(true)
    }

    async fn compare_and_increment(
        &self,
        expected: &RateLimitRecord,
        next: &RateLimitRecord,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;
        match records.get_mut(&expected.key) {
            Some(current) if current == expected => {
                *current = next.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| record.updated_at >= older_than);
        Ok((before - records.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
