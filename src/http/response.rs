//! Response envelopes for the dispatch endpoint.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::engine::ResolutionError;

/// `hit` or `miss`, set on every successful dispatch.
pub const X_DISPATCH_CACHE: &str = "x-dispatch-cache";

/// Handler output, tagged with the cache outcome.
pub fn handler_response(value: Value, cache_hit: bool) -> Response {
    let mut response = Json(value).into_response();
    let cache = if cache_hit { "hit" } else { "miss" };
    response
        .headers_mut()
        .insert(X_DISPATCH_CACHE, HeaderValue::from_static(cache));
    response
}

/// The handler type resolved but does not implement the method.
pub fn not_implemented(type_name: &str, method: &str) -> Response {
    tracing::warn!(handler = %type_name, method = %method, "Resolved handler has no such entry point");
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({ "error": "not_implemented" })),
    )
        .into_response()
}

/// `{"error": code}`, plus `message` and `details` when exposed.
pub fn error_response(error: &ResolutionError, expose_details: bool) -> Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut body = json!({ "error": error.code().as_str() });
    if expose_details {
        body["message"] = Value::String(error.to_string());
        body["details"] = error.details();
    }
    (status, Json(body)).into_response()
}
