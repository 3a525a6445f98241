use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::ratelimit::{CounterStore, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn CounterStore>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CounterStore>) -> Self {
        let limiter = Arc::new(RateLimiter::new(store.clone(), config.rate_limit.clone()));
        Self {
            config,
            store,
            limiter,
        }
    }
}

// Persisted counter, one row per client key.
// Note: FromRow is needed for runtime query_as (without DATABASE_URL at compile time)
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    pub key: String,
    pub attempts: i32,
    pub updated_at: DateTime<Utc>,
}

impl RateLimitRecord {
    /// A fresh record for a client's first request in a window.
    pub fn first(key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            attempts: 1,
            updated_at: now,
        }
    }

    /// The record after one more admitted request.
    pub fn incremented(&self, now: DateTime<Utc>) -> Self {
        Self {
            key: self.key.clone(),
            attempts: self.attempts.saturating_add(1),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}
