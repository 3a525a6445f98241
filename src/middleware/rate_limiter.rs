// Rate limiting middleware
// Runs before any handler; rejections surface as AppError::TooManyRequests
// and are shaped by the exception filter further out.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::models::AppState;
use crate::ratelimit::{client_key, Decision};
use crate::types::AppError;

pub async fn rate_limiter_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.limiter.config().enabled {
        return Ok(next.run(req).await);
    }

    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(req.headers(), remote);

    match state.limiter.admit(&key).await {
        Decision::Denied { retry_after } => Err(AppError::TooManyRequests { retry_after }),
        Decision::Allowed { .. } | Decision::Bypassed => Ok(next.run(req).await),
    }
}
