//! HTTP routes for ClanTracker

pub mod clan_info;
pub mod health;

pub use clan_info::{fetch_clan_info, handle_clan_info, ClanInfo, CLAN_INFO_PREFIX};
pub use health::{health_check, version_info};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::types::TrackerError;

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
struct ApiError<'a> {
    error: &'a str,
}

/// Assemble a JSON response with the shared CORS headers.
pub(crate) fn respond(status: StatusCode, cache_control: &str, body: Vec<u8>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    headers.insert(
        hyper::header::ACCESS_CONTROL_ALLOW_ORIGIN,
        hyper::header::HeaderValue::from_static("*"),
    );
    if let Ok(value) = hyper::header::HeaderValue::from_str(cache_control) {
        headers.insert(hyper::header::CACHE_CONTROL, value);
    }
    response
}

/// Build successful JSON response
pub(crate) fn json_response<T: Serialize>(data: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(data) {
        Ok(body) => respond(StatusCode::OK, "no-cache", body),
        Err(e) => error_response(&TrackerError::from(e)),
    }
}

/// Build error response from a [`TrackerError`]
pub(crate) fn error_response(err: &TrackerError) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(&ApiError {
        error: err.public_message(),
    })
    .unwrap_or_else(|_| br#"{"error":"Internal error"}"#.to_vec());

    respond(err.status_code(), "no-cache", body)
}

/// CORS preflight response
pub fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = respond(StatusCode::OK, "no-cache", Vec::new());
    let headers = response.headers_mut();
    headers.insert(
        hyper::header::ACCESS_CONTROL_ALLOW_HEADERS,
        hyper::header::HeaderValue::from_static("*"),
    );
    headers.insert(
        hyper::header::ACCESS_CONTROL_ALLOW_METHODS,
        hyper::header::HeaderValue::from_static("GET, OPTIONS"),
    );
    response
}

/// Not found response
pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    error_response(&TrackerError::NotFound(format!("No route for {}", path)))
}
