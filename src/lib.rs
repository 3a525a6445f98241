// API Governor - request governance layer for HTTP backends:
// per-client rate limiting and a uniform response envelope

pub mod config;
pub mod db;
pub mod envelope;
pub mod models;
pub mod types;
pub mod ratelimit;
pub mod routes;
pub mod middleware;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use envelope::{Envelope, HandlerOutput};
pub use models::AppState;
pub use types::{AppError, AppResult};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
