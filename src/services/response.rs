//! HTTP response building helpers
//!
//! Every handler answers through these so errors share one JSON shape:
//! `{ "error": "<message>" }`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::error::RelationError;

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Build a JSON response with 200 OK status
pub fn ok<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, body)
}

/// Build an empty response with 204 No Content status
pub fn no_content() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

/// Build a 404 Not Found response with message
pub fn not_found(message: &str) -> Response<Full<Bytes>> {
    json_response(StatusCode::NOT_FOUND, &serde_json::json!({ "error": message }))
}

/// Build a 405 Method Not Allowed response
pub fn method_not_allowed() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "Method not allowed" }),
    )
}

/// Convert a RelationError to an appropriate HTTP response
pub fn error_response(error: RelationError) -> Response<Full<Bytes>> {
    let (status, message) = match &error {
        RelationError::NotFound(msg) => (StatusCode::NOT_FOUND, format!("Not found: {}", msg)),
        RelationError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        RelationError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        RelationError::Json(e) => (StatusCode::BAD_REQUEST, format!("JSON error: {}", e)),
        RelationError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        _ => {
            error!(error = %error, "Request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    };

    json_response(status, &serde_json::json!({ "error": message }))
}

/// Result type alias for handlers
pub type HandlerResult = Result<Response<Full<Bytes>>, RelationError>;

/// Collapse a handler result into a response
pub fn from_handler(result: HandlerResult) -> Response<Full<Bytes>> {
    result.unwrap_or_else(error_response)
}
