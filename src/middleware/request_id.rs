// ============================================================================
// Request ID Middleware - Poll Correlation
// ============================================================================
//
// Every request gets an id so a client's poll cycle can be matched with the
// server-side log lines it produced.
//
// Request: `X-Request-ID: <uuid>` (optional, client can provide)
// Response: `X-Request-ID: <uuid>` (always returned)
//
// ============================================================================

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reuse the client's request id when it is a valid UUID, otherwise mint one
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    request.extensions_mut().insert(request_id);

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        "Incoming request"
    );

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(header::HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    tracing::debug!(
        request_id = %request_id,
        status = %response.status(),
        "Outgoing response"
    );

    response
}
