//! Background eviction of abandoned rate limit records.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::store::{CounterStore, StoreError};
use crate::config::RateLimitConfig;

/// Delete every record not written within `retention`.
pub async fn prune_stale(store: &dyn CounterStore, retention: Duration) -> Result<u64, StoreError> {
    let retention = TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX);
    let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
        return Ok(0);
    };
    store.prune(cutoff).await
}

/// Spawn the periodic pruner. Returns `None` when pruning is disabled.
pub fn spawn_pruner(store: Arc<dyn CounterStore>, config: &RateLimitConfig) -> Option<JoinHandle<()>> {
    if config.prune_interval.is_zero() {
        info!("Rate limit record pruning disabled");
        return None;
    }

    let period = config.prune_interval;
    let retention = config.retention();
    info!(
        interval_secs = period.as_secs(),
        retention_secs = retention.as_secs(),
        "Starting rate limit record pruner"
    );

    Some(tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match prune_stale(store.as_ref(), retention).await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Pruned stale rate limit records"),
                Err(e) => warn!(error = %e, "Failed to prune rate limit records"),
            }
        }
    }))
}
