// Error taxonomy and the declared-exception shape the translator consumes

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests, retry after {retry_after}s")]
    TooManyRequests { retry_after: u64 },

    #[error("HTTP {status}: {payload}")]
    Http { status: StatusCode, payload: Value },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Http { status, .. } => *status,
        }
    }

    /// The payload the error declares. Server-side details stay in the logs.
    pub fn payload(&self) -> Value {
        let status = self.status();
        let error = status.canonical_reason().unwrap_or("Error");
        match self {
            AppError::Database(_) | AppError::Internal(_) => json!({
                "error": error,
                "message": "Internal server error",
            }),
            AppError::NotFound(message)
            | AppError::InvalidRequest(message)
            | AppError::Auth(message)
            | AppError::Forbidden(message)
            | AppError::Conflict(message) => json!({
                "error": error,
                "message": message,
            }),
            AppError::Validation(messages) => json!({
                "error": error,
                "message": messages,
            }),
            AppError::TooManyRequests { retry_after } => json!({
                "error": "Too Many Requests",
                "message": RATE_LIMIT_MESSAGE,
                "retryAfter": retry_after,
            }),
            AppError::Http { payload, .. } => payload.clone(),
        }
    }

    pub fn exception(&self) -> HttpException {
        HttpException {
            status: self.status(),
            payload: self.payload(),
        }
    }
}

/// A request error with a declared status and payload.
///
/// Error responses carry this as an extension; the exception translator
/// replaces their body with the error envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpException {
    pub status: StatusCode,
    pub payload: Value,
}

impl HttpException {
    /// Human-readable message extracted from the payload.
    ///
    /// A plain string payload is the message. A keyed payload contributes its
    /// `message` field; when that field is a list only the first entry is used.
    pub fn message(&self) -> String {
        let fallback = || {
            self.status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string()
        };

        match &self.payload {
            Value::String(message) => message.clone(),
            Value::Object(fields) => match fields.get("message") {
                Some(Value::String(message)) => message.clone(),
                Some(Value::Array(entries)) => match entries.first() {
                    Some(Value::String(first)) => first.clone(),
                    Some(first) => first.to_string(),
                    None => fallback(),
                },
                Some(Value::Null) | None => fallback(),
                Some(other) => other.to_string(),
            },
            _ => fallback(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let exception = self.exception();
        let mut response = (status, Json(exception.payload.clone())).into_response();

        if let AppError::TooManyRequests { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response.extensions_mut().insert(exception);
        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Http {
            status: rejection.status(),
            payload: json!({
                "error": rejection.status().canonical_reason().unwrap_or("Error"),
                "message": rejection.body_text(),
            }),
        }
    }
}
