// Response normalization
// Successful handler results are wrapped into the success envelope.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::envelope::HandlerOutput;
use crate::types::{AppError, HttpException};

/// Largest untagged JSON body the normalizer will buffer.
const MAX_BUFFERED_BODY: usize = 8 * 1024 * 1024;

pub async fn response_normalizer(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    let response = next.run(req).await;
    normalize_response(response, &path).await
}

/// Wrap a successful response in the envelope.
///
/// Tagged [`HandlerOutput`]s are used directly. Untagged JSON bodies are
/// tagged by [`HandlerOutput::from_json`], so a body that is already a complete
/// envelope is left as it is. Anything else (and every error response) passes
/// through.
pub async fn normalize_response(response: Response, path: &str) -> Response {
    if !response.status().is_success() || response.extensions().get::<HttpException>().is_some() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let output = match parts.extensions.remove::<HandlerOutput>() {
        Some(output) => output,
        None if is_json(&parts.headers) => {
            let bytes = match to_bytes(body, MAX_BUFFERED_BODY).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    return AppError::Internal(format!("failed to buffer response body: {}", e))
                        .into_response();
                }
            };
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => HandlerOutput::from_json(value),
                Err(_) => return Response::from_parts(parts, Body::from(bytes)),
            }
        }
        None => return Response::from_parts(parts, body),
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::CONTENT_TYPE);
    let envelope = output.into_envelope(parts.status, path);
    (parts, Json(envelope)).into_response()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Envelope;
    use axum::http::StatusCode;
    use serde_json::json;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_tagged_raw_output_is_wrapped() {
        let response = HandlerOutput::raw(json!({"id": 7, "name": "x"})).into_response();
        let normalized = normalize_response(response, "/api/users/7").await;

        assert_eq!(normalized.status(), StatusCode::OK);
        let body = body_json(normalized).await;
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Success");
        assert_eq!(body["data"], json!({"id": 7, "name": "x"}));
        assert_eq!(body["path"], "/api/users/7");
    }

    #[tokio::test]
    async fn test_status_comes_from_response() {
        let response = (StatusCode::CREATED, HandlerOutput::raw(json!({"message": "Created"})))
            .into_response();
        let body = body_json(normalize_response(response, "/api/items").await).await;

        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["message"], "Created");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_plain_json_is_treated_as_raw() {
        let response = Json(json!([1, 2, 3])).into_response();
        let body = body_json(normalize_response(response, "/api/list").await).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"], json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_plain_json_envelope_is_not_wrapped_twice() {
        let envelope = Envelope {
            status_code: 200,
            success: true,
            message: "Pre".to_string(),
            data: Some(json!({"ok": true})),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            path: "/p".to_string(),
        };
        let response = Json(envelope.clone()).into_response();
        let body = body_json(normalize_response(response, "/api/x").await).await;

        let roundtrip: Envelope = serde_json::from_value(body).unwrap();
        assert_eq!(roundtrip, envelope);
    }

    #[tokio::test]
    async fn test_envelope_passes_through_unchanged() {
        let envelope = Envelope {
            status_code: 200,
            success: true,
            message: "Already wrapped".to_string(),
            data: None,
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            path: "/api/original".to_string(),
        };
        let response = HandlerOutput::from(envelope.clone()).into_response();
        let body = body_json(normalize_response(response, "/api/other").await).await;

        let roundtrip: Envelope = serde_json::from_value(body).unwrap();
        assert_eq!(roundtrip, envelope);
    }

    #[tokio::test]
    async fn test_non_json_and_errors_untouched() {
        let text = normalize_response("plain".into_response(), "/t").await;
        let bytes = to_bytes(text.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"plain");

        let error = normalize_response(
            AppError::NotFound("gone".to_string()).into_response(),
            "/t",
        )
        .await;
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert!(error.extensions().get::<HttpException>().is_some());
    }
}
