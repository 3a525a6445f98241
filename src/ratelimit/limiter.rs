//! Fixed-window request limiter.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, trace, warn};

use super::store::{CounterStore, StoreError};
use crate::config::RateLimitConfig;
use crate::models::RateLimitRecord;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request admitted; `attempts` is the count recorded for the window
    Allowed { attempts: u32 },
    /// Request rejected; the client may retry after `retry_after` seconds
    Denied { retry_after: u64 },
    /// The store failed and the request was let through unchecked
    Bypassed,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Decision::Denied { .. })
    }
}

/// Per-client fixed-window limiter over a shared [`CounterStore`].
///
/// A record's `updated_at` doubles as its window start. Once a record is older
/// than the window it is hard-reset to one attempt, so a burst straddling a
/// reset can admit up to twice `max_requests` in a short span. Every admitted
/// request refreshes `updated_at`.
///
/// Reads and writes are not wrapped in a lock. Each write is a conditional
/// store operation that fails if another request changed the record since it
/// was read; the loser re-reads and decides again. This keeps admissions per
/// window at or below `max_requests` under concurrency.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
    window: TimeDelta,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        let window = TimeDelta::from_std(config.window).unwrap_or(TimeDelta::MAX);
        Self {
            store,
            config,
            window,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check `key` now, failing open on store errors.
    ///
    /// A store failure is logged and the request admitted once; it is not retried.
    pub async fn admit(&self, key: &str) -> Decision {
        match self.check_at(key, Utc::now()).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(key = %key, error = %e, "Rate limit store failure, allowing request");
                Decision::Bypassed
            }
        }
    }

    /// Run one check for `key` as of `now`, recording the attempt if admitted.
    pub async fn check_at(&self, key: &str, now: DateTime<Utc>) -> Result<Decision, StoreError> {
        let max = i64::from(self.config.max_requests);
        let tries = self.config.max_contention_retries.saturating_add(1);

        for _ in 0..tries {
            let Some(record) = self.store.get(key).await? else {
                if self.store.create_if_absent(key, now).await? {
                    trace!(key = %key, "Created rate limit record");
                    return Ok(Decision::Allowed { attempts: 1 });
                }
                trace!(key = %key, "Record created concurrently, re-reading");
                continue;
            };

            let expired = now
                .checked_sub_signed(self.window)
                .is_some_and(|window_start| record.updated_at < window_start);
            if expired {
                let reset = RateLimitRecord::first(key, now);
                if self.store.compare_and_increment(&record, &reset).await? {
                    trace!(key = %key, previous = record.attempts, "Window expired, counter reset");
                    return Ok(Decision::Allowed { attempts: 1 });
                }
                continue;
            }

            if i64::from(record.attempts) >= max {
                let retry_after = self.retry_after(&record, now);
                debug!(
                    key = %key,
                    attempts = record.attempts,
                    retry_after = retry_after,
                    "Rate limit exceeded"
                );
                return Ok(Decision::Denied { retry_after });
            }

            let next = record.incremented(now);
            if self.store.compare_and_increment(&record, &next).await? {
                return Ok(Decision::Allowed {
                    attempts: next.attempts.max(0) as u32,
                });
            }
            trace!(key = %key, "Lost conditional write, re-reading");
        }

        Err(StoreError::Contention {
            key: key.to_string(),
            attempts: tries,
        })
    }

    /// Whole seconds until the record's window ends, rounded up, at least one.
    fn retry_after(&self, record: &RateLimitRecord, now: DateTime<Utc>) -> u64 {
        let remaining_ms = record
            .updated_at
            .checked_add_signed(self.window)
            .map_or(i64::MAX, |window_end| (window_end - now).num_milliseconds());
        let secs = remaining_ms.saturating_add(999).div_euclid(1000);
        secs.max(1) as u64
    }
}
