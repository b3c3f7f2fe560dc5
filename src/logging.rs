//! Middleware for logging requests and responses.

use axum::{
    body::Bytes,
    extract::Request,
    http::header::CONTENT_TYPE,
    middleware::Next,
    response::Response,
};

/// How many bytes of a body to log at the `info` level before truncating.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is truncated
/// and the full body is logged at the `debug` level. Password fields in JSON
/// request bodies are redacted. Multipart uploads are logged without their
/// body to avoid buffering file contents.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let request = if is_multipart(&request) {
        tracing::info!("Received request: {:#?}\nbody: <multipart>", request.headers());
        request
    } else {
        let (parts, body_bytes) = extract_parts_and_body_from_request(request).await;
        let body_text = String::from_utf8_lossy(&body_bytes);

        if is_json(&parts.headers) {
            log_request(&parts, &redact_password(&body_text, "password"));
        } else {
            log_request(&parts, &body_text);
        }

        Request::from_parts(parts, body_bytes.into())
    };

    let response = next.run(request).await;

    let (parts, body_bytes) = extract_parts_and_body_from_response(response).await;
    log_response(&parts, &String::from_utf8_lossy(&body_bytes));

    Response::from_parts(parts, body_bytes.into())
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

fn is_json(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Replace the value of `field_name` in a JSON object with asterisks.
///
/// Text that does not parse as a JSON object is returned unchanged.
fn redact_password(body_text: &str, field_name: &str) -> String {
    let Ok(mut value) = serde_json::from_str::<serde_json::Value>(body_text) else {
        return body_text.to_string();
    };

    match value.get_mut(field_name) {
        Some(field) => *field = serde_json::Value::String("********".to_string()),
        None => return body_text.to_string(),
    }

    value.to_string()
}

async fn extract_parts_and_body_from_request(
    request: Request,
) -> (axum::http::request::Parts, Bytes) {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_else(|error| {
            tracing::warn!("Could not read request body for logging: {error}");
            Bytes::new()
        });

    (parts, body_bytes)
}

async fn extract_parts_and_body_from_response(
    response: Response,
) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_else(|error| {
            tracing::warn!("Could not read response body for logging: {error}");
            Bytes::new()
        });

    (parts, body_bytes)
}

/// Cut `body` down to at most `limit` bytes without splitting a UTF-8
/// character. A byte index inside a multi-byte character is moved back to
/// the nearest boundary.
fn truncate_body(body: &str, limit: usize) -> &str {
    if body.len() <= limit {
        return body;
    }

    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {parts:#?}\nbody: {:}...",
            truncate_body(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {parts:#?}\nbody: {body:?}");
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {parts:#?}\nbody: {:}...",
            truncate_body(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {parts:#?}\nbody: {body:?}");
    }
}
