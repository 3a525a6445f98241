// Exception translation
// Error responses get their body replaced by the error envelope. Responses
// tagged with an HttpException use its declared status and payload; untagged
// 4xx/5xx responses (routing, extractor rejections) are declared from their
// own status and body. Successful responses pass through untouched.

use axum::{
    body::to_bytes,
    extract::Request,
    http::{header, response::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::debug;

use crate::envelope::Envelope;
use crate::types::HttpException;

/// Largest untagged error body read to recover its message.
const MAX_ERROR_BODY: usize = 64 * 1024;

pub async fn exception_filter(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    let response = next.run(req).await;
    translate_exception(response, &path).await
}

pub async fn translate_exception(response: Response, path: &str) -> Response {
    if let Some(exception) = response.extensions().get::<HttpException>().cloned() {
        let (mut parts, _body) = response.into_parts();
        parts.extensions.remove::<HttpException>();
        return render(parts, &exception, path);
    }

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let payload = match to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => undeclared_payload(&bytes),
        Err(e) => {
            debug!(error = %e, "Could not read error body, using status reason");
            Value::Null
        }
    };

    if let Ok(envelope) = serde_json::from_value::<Envelope>(payload.clone()) {
        return finish(parts, envelope);
    }

    let exception = HttpException { status, payload };
    render(parts, &exception, path)
}

/// Payload of an error raised without a declaration: its JSON body, else its
/// text, else nothing (the status reason is used).
fn undeclared_payload(bytes: &[u8]) -> Value {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return value;
    }
    match std::str::from_utf8(bytes).map(str::trim) {
        Ok(text) if !text.is_empty() => Value::String(text.to_string()),
        _ => Value::Null,
    }
}

fn render(parts: Parts, exception: &HttpException, path: &str) -> Response {
    let envelope = Envelope::failure(exception.status, exception.message(), path);
    finish(parts, envelope)
}

fn finish(mut parts: Parts, envelope: Envelope) -> Response {
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::CONTENT_TYPE);
    (parts, Json(envelope)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppError;
    use axum::http::StatusCode;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_declared_error_becomes_envelope() {
        let response = translate_exception(
            AppError::NotFound("Not found".to_string()).into_response(),
            "/api/users/9",
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Not found");
        assert_eq!(body["path"], "/api/users/9");
        assert!(body["timestamp"].is_string());
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_rejection_keeps_retry_after_header() {
        let response = translate_exception(
            AppError::TooManyRequests { retry_after: 12 }.into_response(),
            "/api/chat",
        )
        .await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "12");

        let body = body_json(response).await;
        assert_eq!(body["message"], "Rate limit exceeded. Please try again later.");
    }

    #[tokio::test]
    async fn test_untagged_error_text_becomes_message() {
        let response = translate_exception(
            (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
            "/x",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let body = body_json(response).await;
        assert_eq!(body["statusCode"], 502);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "upstream down");
        assert_eq!(body["path"], "/x");
    }

    #[tokio::test]
    async fn test_untagged_empty_error_uses_reason() {
        let response = translate_exception(
            StatusCode::METHOD_NOT_ALLOWED.into_response(),
            "/api/users",
        )
        .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Method Not Allowed");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_untagged_json_error_message_flattened() {
        let response = translate_exception(
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({"message": ["first", "second"]})),
            )
                .into_response(),
            "/x",
        )
        .await;

        let body = body_json(response).await;
        assert_eq!(body["statusCode"], 422);
        assert_eq!(body["message"], "first");
    }

    #[tokio::test]
    async fn test_success_untouched() {
        let response = translate_exception("fine".into_response(), "/x").await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"fine");
    }
}
