//! Rate limiting: counter stores, the fixed-window limiter, client keys and
//! record pruning.

mod identity;
mod limiter;
mod memory;
mod postgres;
mod pruner;
mod store;

pub use identity::{client_identity, client_key, KEY_PREFIX, UNKNOWN_CLIENT};
pub use limiter::{Decision, RateLimiter};
pub use memory::MemoryCounterStore;
pub use postgres::PgCounterStore;
pub use pruner::{prune_stale, spawn_pruner};
pub use store::{CounterStore, StoreError};
