//! Request IDs and the per-request tracing span.
//!
//! A caller-supplied `X-Request-Id` is kept when it is short and non-empty;
//! otherwise a ULID is minted. Either way the ID is echoed on the response.

use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{Instrument, debug, info, warn};

use crate::utils::fmt_duration;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest caller-supplied ID that is kept.
const MAX_CLIENT_ID_LEN: usize = 64;

fn resolve_request_id(req: &Request) -> String {
    req.headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_CLIENT_ID_LEN)
        .map(str::to_owned)
        .unwrap_or_else(|| ulid::Ulid::new().to_string())
}

/// `axum::middleware::from_fn` handler wrapping every API request.
pub async fn track_request(req: Request, next: Next) -> Response {
    let request_id = resolve_request_id(&req);
    let span = tracing::info_span!(
        "api",
        request_id = %request_id,
        method = %req.method(),
        route = req.uri().path(),
    );
    let start = Instant::now();

    let mut response = next.run(req).instrument(span.clone()).await;

    let status = response.status().as_u16();
    let elapsed = fmt_duration(start.elapsed());
    span.in_scope(|| match status {
        500.. => warn!(status, elapsed, "Request failed"),
        400..=499 => info!(status, elapsed, "Request rejected"),
        _ => debug!(status, elapsed, "Request served"),
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    fn request(id: Option<&str>) -> Request {
        let mut builder = http::Request::get("/api/health");
        if let Some(id) = id {
            builder = builder.header("x-request-id", id);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn keeps_caller_id() {
        assert_eq!(resolve_request_id(&request(Some(" trace-7 "))), "trace-7");
    }

    #[test]
    fn mints_ulid_when_missing_or_oversized() {
        let minted = resolve_request_id(&request(None));
        assert!(ulid::Ulid::from_string(&minted).is_ok());

        let long = "x".repeat(MAX_CLIENT_ID_LEN + 1);
        let replaced = resolve_request_id(&request(Some(&long)));
        assert_ne!(replaced, long);
        assert!(ulid::Ulid::from_string(&replaced).is_ok());
    }
}
