//! API Routes
//!
//! - `/api/health` - Health check
//!
//! Every route, including the not-found fallback, runs behind the governance
//! pipeline assembled by [`govern`]:
//!
//! ```text
//! catch-panic → trace → CORS → exception filter → rate limiter → normalizer → handler
//! ```

pub mod health;

use axum::{
    http::{Method, Uri},
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::info;

use crate::middleware::{
    apply_cors, exception_filter, rate_limiter_middleware, response_normalizer,
};
use crate::models::AppState;
use crate::types::AppError;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let api_router = Router::new().merge(health::router(state.clone()));

    govern(api_router, state)
}

/// Wrap any router in the governance pipeline.
///
/// Layers added later run earlier on the request path, so the exception
/// filter sees rate limit rejections and the normalizer only sees requests
/// the limiter admitted.
pub fn govern(router: Router, state: AppState) -> Router {
    let router = router
        .fallback(route_not_found)
        .layer(from_fn(response_normalizer))
        .layer(from_fn_with_state(state.clone(), rate_limiter_middleware))
        .layer(from_fn(exception_filter));

    apply_cors(router, &state.config.server.cors_allowed_origins)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}

async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("Cannot {} {}", method, uri.path()))
}
