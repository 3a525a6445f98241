use axum::{Router, routing::get, extract::State};
use tracing::warn;
use crate::envelope::HandlerOutput;
use crate::models::{AppState, HealthResponse};
use crate::types::AppResult;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> AppResult<HandlerOutput> {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "Counter store health check failed");
            "unavailable"
        }
    };

    let response = HealthResponse {
        status: "ok".to_string(),
        database: database.to_string(),
    };

    HandlerOutput::from_serialize(&response)
}
